use shared::{domain::Sector, protocol::SectorSummary};

/// Source of the active trail list for each sector.
pub trait TrailCatalog: Send + Sync {
    fn trails_for(&self, sector: Sector) -> &[&'static str];
    fn display_name(&self, sector: Sector) -> &str;

    fn contains(&self, sector: Sector, trail: &str) -> bool {
        self.trails_for(sector).iter().any(|known| *known == trail)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticCatalog;

impl TrailCatalog for StaticCatalog {
    fn trails_for(&self, sector: Sector) -> &[&'static str] {
        sector.trails()
    }

    fn display_name(&self, sector: Sector) -> &str {
        sector.display_name()
    }
}

pub fn sector_summaries(catalog: &dyn TrailCatalog) -> Vec<SectorSummary> {
    Sector::ALL
        .into_iter()
        .map(|sector| SectorSummary {
            sector,
            display_name: catalog.display_name(sector).to_string(),
            trails: catalog
                .trails_for(sector)
                .iter()
                .map(|trail| trail.to_string())
                .collect(),
        })
        .collect()
}
