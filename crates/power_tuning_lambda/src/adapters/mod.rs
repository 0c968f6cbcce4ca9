pub mod lambda_control_plane;
