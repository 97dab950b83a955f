use crate::catalog::CatalogCore;
use crate::errors::AppResult;
use crate::models::{CreateItemPayload, IdentityProfile};

const SEED_EMAIL: &str = "seed@localhost";
const SEED_NAME: &str = "Catalog Seeder";

const DEMO_ITEMS: &[(&str, &str, &str)] = &[
    ("Soccerball", "ball for playing soccer", "Soccer"),
    ("Basketball", "ball for shooting hoops", "Basketball"),
    ("Bat", "wooden bat for hitting baseballs", "Baseball"),
    ("Frisbee", "flying disc for ultimate", "Frisbee"),
    ("Snowboard", "board for snowboarding", "Snowboarding"),
    ("Harness", "climbing harness with belay loop", "Rock Climbing"),
    ("Football", "ball for throwing spirals", "Football"),
    ("Skates", "pair of inline skates", "Skating"),
    ("Stick", "hockey stick with a curved blade", "Hockey"),
];

/// Fills an empty catalog with one demo item per sport. Returns how many items were
/// created; a catalog that already has categories is left untouched.
pub fn seed_demo_catalog(catalog: &CatalogCore) -> AppResult<usize> {
    if !catalog.list_categories()?.is_empty() {
        tracing::debug!("catalog already populated; skipping demo seed");
        return Ok(0);
    }

    let owner = catalog.sign_in(&IdentityProfile {
        email: SEED_EMAIL.to_string(),
        name: SEED_NAME.to_string(),
        picture_url: String::new(),
    })?;

    for (name, description, category) in DEMO_ITEMS {
        let payload = CreateItemPayload {
            name: (*name).to_string(),
            description: (*description).to_string(),
            category: (*category).to_string(),
        };
        catalog.create_item(&payload, owner.id)?;
    }
    tracing::info!(items = DEMO_ITEMS.len(), owner_id = owner.id, "seeded demo catalog");
    Ok(DEMO_ITEMS.len())
}
