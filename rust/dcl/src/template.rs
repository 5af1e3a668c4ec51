//! URL templates of the form `projects/{{project}}/locations/{{location}}`.

use std::collections::BTreeMap;

use snafu::{ResultExt, Snafu};
use url::Url;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse URL {url:?}"))]
    ParseUrl { source: url::ParseError, url: String },
}

pub type Params<'a> = BTreeMap<&'a str, String>;

/// Replaces every `{{key}}` in `template` with the matching parameter.
///
/// Placeholders without a parameter are left in place.
pub fn nprintf(template: &str, params: &Params) -> String {
    params
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{{{key}}}}}"), value)
        })
}

/// Expands `template` relative to the user supplied base path, or `default_base` if there is
/// none.
pub fn url(
    template: &str,
    default_base: &str,
    user_base: Option<&str>,
    params: &Params,
) -> Result<String, Error> {
    let base = user_base.filter(|b| !b.is_empty()).unwrap_or(default_base);
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let full = format!("{base}{}", nprintf(template, params));
    Url::parse(&full).context(ParseUrlSnafu { url: &full })?;
    Ok(full)
}

/// Appends query parameters to `url`, skipping empty values.
pub fn add_query_params(url: &str, params: &[(&str, &str)]) -> Result<String, Error> {
    let mut parsed = Url::parse(url).context(ParseUrlSnafu { url })?;
    let params = params
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .collect::<Vec<_>>();
    if !params.is_empty() {
        let mut query = parsed.query_pairs_mut();
        for (key, value) in params {
            query.append_pair(key, value);
        }
    }
    Ok(parsed.into())
}
