//! Manifest rendering
//!
//! The manifest is a launch-time snapshot: it is rendered once over the
//! items that were actually moved into the batch and never regenerated from
//! live state afterwards.

use chrono::{DateTime, Utc};
use shared::{BatchId, Item, Process};

const RULE: &str = "========================================";

/// Render the manifest text for a freshly launched batch.
///
/// Items are numbered from 1 in the order they were moved (the cart's
/// newest-first listing order). Infill appears only for filament parts.
pub fn render_manifest(batch: &BatchId, created_at: DateTime<Utc>, items: &[Item]) -> String {
    let mut out = String::new();

    out.push_str(&format!("Production batch {}\n", batch));
    out.push_str(&format!("Created: {} UTC\n", created_at.format("%Y-%m-%d %H:%M:%S")));
    out.push_str(RULE);
    out.push('\n');

    let mut total: u64 = 0;
    for (index, item) in items.iter().enumerate() {
        total += u64::from(item.quantity);

        out.push('\n');
        out.push_str(&format!("#{}  {}\n", index + 1, item.filename));
        out.push_str(&format!("    Quantity:   {}\n", item.quantity));
        match item.config.process() {
            Process::Filament { material, infill } => {
                out.push_str("    Technology: FDM\n");
                out.push_str(&format!("    Material:   {}\n", material));
                out.push_str(&format!("    Infill:     {}%\n", infill));
            }
            Process::Other { tech, material } => {
                out.push_str(&format!("    Technology: {}\n", tech));
                out.push_str(&format!("    Material:   {}\n", material));
            }
        }
        out.push_str(&format!("    Item id:    {}\n", item.id));
    }

    out.push('\n');
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("Total parts: {}\n", total));

    out
}
