//! Cost accounting for the tuning workflow and the visualization link.

use base64::Engine as _;

use crate::contract::ExtractedStats;

/// Cost of one state transition of the orchestrating workflow.
pub const STATE_TRANSITION_COST: f64 = 0.000025;

/// Fixed number of transitions executed per tuning run, independent of the
/// number of power values.
pub const FIXED_STATE_TRANSITIONS: u32 = 6;

pub const DEFAULT_STATE_MACHINE_EXECUTION_COST: f64 =
    STATE_TRANSITION_COST * FIXED_STATE_TRANSITIONS as f64;

#[derive(Debug, Clone, PartialEq)]
pub struct CostSettings {
    pub execution_cost: f64,
    pub visualization_url: Option<String>,
}

impl Default for CostSettings {
    fn default() -> Self {
        Self {
            execution_cost: DEFAULT_STATE_MACHINE_EXECUTION_COST,
            visualization_url: None,
        }
    }
}

/// Total spend of every measured configuration, not only the winner.
pub fn lambda_cost(stats: &[ExtractedStats]) -> f64 {
    stats.iter().map(|entry| entry.total_cost).sum()
}

/// Builds `<base>#<sizes>;<times>;<costs>` with each list packed as
/// little-endian binary (`i16` sizes, `f32` times and costs) and base64
/// encoded, ordered by ascending power.
///
/// Records whose power does not fit an `i16` cannot be plotted and are left
/// out of the link.
pub fn build_visualization_url(stats: &[ExtractedStats], base_url: Option<&str>) -> Option<String> {
    let base_url = base_url.map(str::trim).filter(|url| !url.is_empty())?;

    let mut ordered: Vec<(i16, &ExtractedStats)> = stats
        .iter()
        .filter_map(|entry| match i16::try_from(entry.power) {
            Ok(size) => Some((size, entry)),
            Err(_) => {
                tracing::warn!(
                    power = entry.power,
                    "power value too large for visualization, skipping"
                );
                None
            }
        })
        .collect();
    ordered.sort_by_key(|(size, _)| *size);

    let sizes = encode_le(ordered.iter().map(|(size, _)| size.to_le_bytes()));
    let times = encode_le(
        ordered
            .iter()
            .map(|(_, entry)| (entry.duration as f32).to_le_bytes()),
    );
    let costs = encode_le(
        ordered
            .iter()
            .map(|(_, entry)| (entry.cost as f32).to_le_bytes()),
    );

    Some(format!("{base_url}#{sizes};{times};{costs}"))
}

fn encode_le<const N: usize>(values: impl Iterator<Item = [u8; N]>) -> String {
    let bytes: Vec<u8> = values.flatten().collect();
    base64::engine::general_purpose::STANDARD.encode(bytes)
}
