//! Prompt text sent to the generative service.
//!
//! Only the answer shape matters downstream: lists must come back as quoted
//! strings in brackets, judgements as a leading yes/no, finder answers with
//! one `https://` URL.

/// Appended to every list request so the answer fits the list grammar.
const LIST_FORMAT: &str = "Answer with a single list of double-quoted strings in square \
brackets, for example [\"first\", \"second\"], and nothing else.";

pub fn parameter_names(label: &str, count: usize) -> String {
    format!(
        "I am an architect and want to describe building products in detail.\n\n\
I am looking to create a list of {count} accurate BIM parameters for the {label} product class.\n\n\
Exclude manufacturer specific parameters such as manufacturer, serial number or model name.\n\
Exclude parameters such as dimensions, weight, height or cost.\n\n\
These parameters should be pertinent to architecture and construction.\n\n\
Only return the parameter names, not their values or descriptions. {LIST_FORMAT}"
    )
}

pub fn parameter_values(parameter: &str, label: &str, count: usize) -> String {
    format!(
        "Return a list of {count} values for the {parameter} parameter of the {label} product class.\n\n\
These {count} values should be pertinent to {label} in the context of architecture and construction.\n\n\
Only return the values, not the parameter name or descriptions. {LIST_FORMAT}"
    )
}

// ---------------------------------------------------------------------------
// Judgement
// ---------------------------------------------------------------------------

/// System and user text for one judgement question.
///
/// `template` may use `{title}`, `{link}`, and `{snippet}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeProfile {
    pub name: &'static str,
    pub system: &'static str,
    pub template: &'static str,
}

impl JudgeProfile {
    /// Fill the placeholders in one pass; substituted text is never rescanned.
    pub fn render(&self, title: &str, link: &str, snippet: &str) -> String {
        let mut out = String::with_capacity(self.template.len() + title.len() + snippet.len());
        let mut rest = self.template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let (value, len) = if tail.starts_with("{title}") {
                (title, "{title}".len())
            } else if tail.starts_with("{link}") {
                (link, "{link}".len())
            } else if tail.starts_with("{snippet}") {
                (snippet, "{snippet}".len())
            } else {
                ("{", 1)
            };
            out.push_str(value);
            rest = &tail[len..];
        }
        out.push_str(rest);
        out
    }
}

/// Does this search result belong to a company that makes products?
pub const SITE_CHECK: JudgeProfile = JudgeProfile {
    name: "site check",
    system: "You classify web search results. Answer with yes or no only.",
    template: "Is the following search result the website of a company that manufactures \
products? Marketplaces, directories, news articles, and blogs do not count.\n\n\
Title: {title}\nURL: {link}\nDescription: {snippet}\n\nAnswer yes or no.",
};

/// Is this bare base URL a manufacturer's own site?
pub const SITE_VERIFY: JudgeProfile = JudgeProfile {
    name: "site verify",
    system: "You check company websites. Answer with yes or no only.",
    template: "Is {link} the official website of {title}, a company that manufactures \
products?\n\nAnswer yes or no.",
};

/// Name of the company behind a search result.
pub const NAME_EXTRACT: JudgeProfile = JudgeProfile {
    name: "name extract",
    system: "You extract company names from web search results.",
    template: "Which company does the following search result belong to?\n\n\
Title: {title}\nURL: {link}\nDescription: {snippet}\n\n\
Answer with the company name only.",
};

// ---------------------------------------------------------------------------
// URL finder
// ---------------------------------------------------------------------------

pub fn website_lookup(manufacturer: &str, listing: &str) -> String {
    format!(
        "You will be given a list of search results for a manufacturer company named {manufacturer}.\n\n\
Your job is to determine which site is the website for {manufacturer}.\n\n\
Search Results:\n{listing}\n\n\
Return the URL of {manufacturer}'s website."
    )
}

pub fn product_page_lookup(manufacturer: &str, listing: &str) -> String {
    format!(
        "You will be given a list of search results for a manufacturer company named {manufacturer}.\n\n\
Your job is to determine which URL is the product page for {manufacturer}.\n\n\
Search Results:\n{listing}\n\n\
Return the product page URL."
    )
}
