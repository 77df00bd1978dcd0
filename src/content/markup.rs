use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use tracing::{debug, trace};

static FORM: Lazy<Selector> = Lazy::new(|| Selector::parse("form").unwrap());
static META: Lazy<Selector> = Lazy::new(|| Selector::parse("meta").unwrap());
static SCRIPT_WITH_SRC: Lazy<Selector> = Lazy::new(|| Selector::parse("script[src]").unwrap());
static LINK_WITH_HREF: Lazy<Selector> = Lazy::new(|| Selector::parse("link[href]").unwrap());

/// Structural markers found in a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ContentFeatures {
    pub has_forms: bool,
    pub external_redirection: bool,
    pub external_resources: bool,
}

/// Inspects HTML for forms, meta refresh and absolute script/stylesheet references
///
/// Malformed markup is parsed leniently and never fails.
pub fn inspect_markup(html: &str) -> ContentFeatures {
    let document = Html::parse_document(html);

    let has_forms = document.select(&FORM).next().is_some();

    // Exact, case-sensitive attribute match
    let external_redirection = document
        .select(&META)
        .any(|meta| meta.value().attr("http-equiv") == Some("refresh"));

    let scripts = document
        .select(&SCRIPT_WITH_SRC)
        .filter_map(|script| script.value().attr("src"));
    let stylesheets = document
        .select(&LINK_WITH_HREF)
        .filter(|link| {
            link.value()
                .attr("rel")
                .map(|rel| rel.split_ascii_whitespace().any(|token| token == "stylesheet"))
                .unwrap_or(false)
        })
        .filter_map(|link| link.value().attr("href"));

    let external_resources = scripts
        .chain(stylesheets)
        .filter(|reference| !reference.is_empty())
        .inspect(|reference| trace!("Resource reference: {}", reference))
        .any(|reference| reference.contains("http"));

    let features = ContentFeatures {
        has_forms,
        external_redirection,
        external_resources,
    };
    debug!("Markup inspection result: {:?}", features);
    features
}
