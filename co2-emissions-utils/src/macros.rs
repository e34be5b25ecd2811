/// Compiles a CSS selector once and hands out a `&'static Selector`.
///
/// The pattern must be a literal that is known to parse.
#[macro_export]
macro_rules! selector {
    ($e: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::scraper::Selector;
        static SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse($e).unwrap());
        &*SELECTOR
    }};
}

/// Same as [`selector!`], for regular expressions.
#[macro_export]
macro_rules! regex {
    ($e: expr) => {{
        use ::once_cell::sync::Lazy;
        use ::regex::Regex;
        static PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new($e).unwrap());
        &*PATTERN
    }};
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    #[test]
    fn selector_is_reusable() {
        let html = Html::parse_fragment("<table><tr><td>x</td></tr></table>");
        let first = || html.select(selector!("td")).count();
        assert_eq!(first(), 1);
        assert_eq!(first(), 1);
    }

    #[test]
    fn regex_is_reusable() {
        let strip = |s: &str| regex!(r"\[[^\]]*\]").replace_all(s, "").into_owned();
        assert_eq!(strip("China[a]"), "China");
        assert_eq!(strip("India[12][n 1]"), "India");
    }
}
