//! Admission pipeline of the frontier

use proptest::prelude::*;

use tarantula::{CrawlConfig, Frontier};

fn config() -> CrawlConfig {
    CrawlConfig::default()
}

#[test]
fn second_admission_is_a_noop() {
    let config = config();
    let mut frontier = Frontier::new();

    assert_eq!(frontier.admit(&["http://a.com/x"], None, &config).len(), 1);
    let again = frontier.admit(&["http://a.com/x"], Some("http://a.com/"), &config);

    assert!(again.is_empty());
    assert_eq!(frontier.len(), 1);
}

#[test]
fn duplicates_within_one_batch_collapse() {
    let mut frontier = Frontier::new();
    let admitted = frontier.admit(
        &["http://a.com/x", "http://a.com/x", "http://a.com/x#top"],
        None,
        &config(),
    );
    assert_eq!(admitted, ["http://a.com/x".to_string()]);
}

#[test]
fn fragments_trimmed_only_when_enabled() {
    let mut frontier = Frontier::new();
    let admitted = frontier.admit(&["http://a/x#frag"], None, &config());
    assert_eq!(admitted, ["http://a/x".to_string()]);

    let keep = CrawlConfig::builder().trim_hashes(false).build().unwrap();
    let mut frontier = Frontier::new();
    let admitted = frontier.admit(&["http://a/x#frag"], None, &keep);
    assert_eq!(admitted, ["http://a/x#frag".to_string()]);
}

#[test]
fn range_restriction_applies_to_discovered_links_only() {
    let ranged = CrawlConfig::builder().stay_in_range(true).build().unwrap();
    let mut frontier = Frontier::new();
    frontier.admit(&["http://a.com/"], None, &ranged);

    let dropped = frontier.admit(&["http://b.com/"], Some("http://a.com/"), &ranged);
    assert!(dropped.is_empty());

    let open = config();
    let mut frontier = Frontier::new();
    frontier.admit(&["http://a.com/"], None, &open);
    let admitted = frontier.admit(&["http://b.com/"], Some("http://a.com/"), &open);
    assert_eq!(admitted, ["http://b.com/".to_string()]);
}

#[test]
fn range_is_the_seed_directory() {
    let ranged = CrawlConfig::builder().stay_in_range(true).build().unwrap();
    let mut frontier = Frontier::new();
    frontier.admit(&["http://ex.com/docs/intro"], None, &ranged);

    assert_eq!(frontier.range().prefixes(), ["http://ex.com/docs/".to_string()]);
    let admitted = frontier.admit(
        &["/docs/usage", "/blog/post"],
        Some("http://ex.com/docs/intro"),
        &ranged,
    );
    assert_eq!(admitted, ["http://ex.com/docs/usage".to_string()]);
}

#[test]
fn relative_links_resolve_against_origin() {
    let mut frontier = Frontier::new();
    frontier.admit(&["http://ex.com/dir/a"], None, &config());

    let admitted = frontier.admit(&["b", "../c", "//cdn.ex.com/d"], Some("http://ex.com/dir/a"), &config());
    assert_eq!(
        admitted,
        [
            "http://ex.com/dir/b".to_string(),
            "http://ex.com/c".to_string(),
            "http://cdn.ex.com/d".to_string(),
        ]
    );
}

#[test]
fn non_http_schemes_dropped_unless_allowed() {
    let mut frontier = Frontier::new();
    let admitted = frontier.admit(
        &["mailto:x@x.com", "ftp://ex.com/f", "javascript:void(0)", ""],
        Some("http://ex.com/"),
        &config(),
    );
    assert!(admitted.is_empty());

    let lax = CrawlConfig::builder().http_only(false).build().unwrap();
    let mut frontier = Frontier::new();
    let admitted = frontier.admit(&["ftp://ex.com/f"], Some("http://ex.com/"), &lax);
    assert_eq!(admitted, ["ftp://ex.com/f".to_string()]);
}

#[test]
fn exclusions_and_predicate_run_last() {
    let config = CrawlConfig::builder()
        .excluded_patterns(vec!["*.pdf".to_string()])
        .should_visit(|uri: &str| !uri.contains("private"))
        .build()
        .unwrap();
    let mut frontier = Frontier::new();

    let admitted = frontier.admit(
        &["/paper.pdf", "/private/x", "/public/y"],
        Some("http://ex.com/"),
        &config,
    );
    assert_eq!(admitted, ["http://ex.com/public/y".to_string()]);
}

#[test]
fn self_link_and_mailto_are_dropped() {
    let config = CrawlConfig::builder()
        .legs(1)
        .stay_in_range(true)
        .build()
        .unwrap();
    let mut frontier = Frontier::new();
    frontier.admit(&["http://ex.com/a"], None, &config);

    let admitted = frontier.admit(
        &["http://ex.com/b", "http://ex.com/a#ignore", "mailto:x@x.com"],
        Some("http://ex.com/a"),
        &config,
    );
    assert_eq!(admitted, ["http://ex.com/b".to_string()]);
}

proptest! {
    #[test]
    fn admitted_uris_are_unique_and_fragment_free(
        paths in proptest::collection::vec("[a-c]{1,3}(#[a-z]{0,2})?", 0..40)
    ) {
        let config = CrawlConfig::default();
        let mut frontier = Frontier::new();
        let links: Vec<String> = paths.iter().map(|p| format!("/{p}")).collect();

        frontier.admit(links.as_slice(), Some("http://ex.com/"), &config);
        frontier.admit(links.as_slice(), Some("http://ex.com/"), &config);

        let uris = frontier.uris();
        let unique: std::collections::HashSet<&String> = uris.iter().collect();
        prop_assert_eq!(unique.len(), uris.len());
        prop_assert!(uris.iter().all(|uri| !uri.contains('#')));
        prop_assert!(uris.iter().all(|uri| uri.starts_with("http://ex.com/")));
    }

    #[test]
    fn frontier_only_grows(batches in proptest::collection::vec(
        proptest::collection::vec("[a-e]{1,2}", 0..6), 0..8)
    ) {
        let config = CrawlConfig::default();
        let mut frontier = Frontier::new();
        let mut last = 0;
        for batch in &batches {
            let admitted = frontier.admit(batch.as_slice(), Some("http://ex.com/"), &config);
            prop_assert_eq!(frontier.len(), last + admitted.len());
            last = frontier.len();
        }
    }
}
