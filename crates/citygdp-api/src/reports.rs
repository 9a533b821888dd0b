use citygdp_types::models::ReportView;

/// Dashboard views in display order. The first entry is the fallback.
const VIEWS: &[(&str, &str)] = &[
    (
        "Homepage",
        "Overview of the city-level economic dashboard. Use the other views to \
         compare GDP, sector mix, innovation and employment across Indian cities.",
    ),
    (
        "GDP",
        "City GDP compared year over year for 2020 to 2024, with the cities \
         driving national growth and the gaps between regions.",
    ),
    (
        "Sectoral Contributions",
        "Share of agriculture, industry, services and technology in each \
         city's GDP and how that mix has shifted over time.",
    ),
    (
        "City-wise Patents",
        "Patents filed per 100,000 inhabitants as a measure of each city's \
         research and innovation output.",
    ),
    (
        "City-wise Expenditure",
        "Research and development spending as a percentage of city GDP.",
    ),
    (
        "City-wise Employment Rates",
        "Employment in ICT, SMEs and tourism, alongside overall and youth \
         unemployment, per city.",
    ),
];

/// The embedded BI report views. All views point at one published report;
/// its URL comes from configuration.
#[derive(Debug, Clone)]
pub struct ReportCatalog {
    embed_url: String,
}

impl ReportCatalog {
    pub fn new(embed_url: impl Into<String>) -> Self {
        Self {
            embed_url: embed_url.into(),
        }
    }

    pub fn titles(&self) -> Vec<String> {
        VIEWS.iter().map(|(title, _)| title.to_string()).collect()
    }

    /// Look up a view by exact title. Unknown or missing titles get the homepage.
    pub fn select(&self, view: Option<&str>) -> ReportView {
        let (title, description) = view
            .and_then(|wanted| VIEWS.iter().find(|(title, _)| *title == wanted))
            .unwrap_or(&VIEWS[0]);

        ReportView {
            title: title.to_string(),
            description: description.to_string(),
            embed_url: self.embed_url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_known_view() {
        let catalog = ReportCatalog::new("https://reports.example/embed");
        let view = catalog.select(Some("City-wise Patents"));
        assert_eq!(view.title, "City-wise Patents");
        assert!(view.description.contains("100,000"));
        assert_eq!(view.embed_url, "https://reports.example/embed");
    }

    #[test]
    fn unknown_or_missing_view_falls_back_to_homepage() {
        let catalog = ReportCatalog::new("u");
        assert_eq!(catalog.select(Some("Weather")).title, "Homepage");
        assert_eq!(catalog.select(None).title, "Homepage");
        // Titles match exactly
        assert_eq!(catalog.select(Some("gdp")).title, "Homepage");
    }

    #[test]
    fn titles_in_display_order() {
        let titles = ReportCatalog::new("u").titles();
        assert_eq!(titles.len(), 6);
        assert_eq!(titles[0], "Homepage");
        assert_eq!(titles[5], "City-wise Employment Rates");
    }
}
