pub mod finalizer;
pub mod initializer;
