use rand::Rng;

use crate::{GameContent, ItemId};

/// Rolls the global drop table once: `loot_chance` to drop anything, then an
/// item picked by weight. Zero-weight items never drop.
pub fn roll_loot(content: &GameContent, rng: &mut impl Rng) -> Option<ItemId> {
    if rng.gen::<f64>() >= content.constants.loot_chance {
        return None;
    }
    let total: u32 = content.items.iter().map(|i| i.weight).sum();
    if total == 0 {
        return None;
    }
    let mut pick = rng.gen_range(0..total);
    for item in &content.items {
        if pick < item.weight {
            return Some(item.id.clone());
        }
        pick -= item.weight;
    }
    None
}
