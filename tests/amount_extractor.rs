// tests/amount_extractor.rs
use startup_revenue_tracker::analyze::amount::{default_rules, extract, AmountKind};
use startup_revenue_tracker::analyze::normalize::normalize;

fn extract_one(text: &str) -> (f64, AmountKind) {
    let out = extract(&normalize(text), &default_rules());
    assert_eq!(out.len(), 1, "expected exactly one candidate in {text:?}");
    (out[0].value_millions, out[0].kind)
}

#[test]
fn equivalent_phrasings_normalize_to_the_same_millions() {
    for text in [
        "The startup posted $75M in ARR.",
        "The startup posted $0.075B in ARR.",
        "The startup posted $75,000K in ARR.",
        "The startup posted ARR of $75 million.",
        "The startup posted 75 million dollars in ARR.",
    ] {
        let (value, kind) = extract_one(text);
        assert!((value - 75.0).abs() < 1e-9, "got {value} for {text:?}");
        assert_eq!(kind, AmountKind::Arr, "for {text:?}");
    }
}

#[test]
fn kind_classification_follows_context() {
    assert_eq!(extract_one("BetaWorks posted revenue of $52 million.").1, AmountKind::Revenue);
    assert_eq!(extract_one("BetaWorks posted bookings of $52 million.").1, AmountKind::Bookings);
    assert_eq!(extract_one("BetaWorks reported $52M in sales.").1, AmountKind::Sales);
    assert_eq!(
        extract_one("BetaWorks reported $52M in annual recurring revenue.").1,
        AmountKind::Arr
    );
    assert_eq!(extract_one("BetaWorks touts a $52M run rate.").1, AmountKind::Unknown);
}

#[test]
fn billions_scale_to_thousands_of_millions() {
    let (value, kind) = extract_one("MegaCorp reached $4.2bn in revenue last year.");
    assert!((value - 4200.0).abs() < 1e-6);
    assert_eq!(kind, AmountKind::Revenue);
}

#[test]
fn amounts_without_revenue_context_are_ignored() {
    for text in [
        "The startup raised $50M from three venture funds.",
        "The acquisition was valued at $900 million by both boards.",
        "A $75M fine was levied by the regulator.",
    ] {
        let out = extract(&normalize(text), &default_rules());
        assert!(out.is_empty(), "expected no candidates in {text:?}");
    }
}

#[test]
fn candidates_are_not_deduplicated_by_the_extractor() {
    // Same figure twice: the extractor reports both, in order of appearance;
    // collapsing duplicates is the assembler's job.
    let text = normalize(
        "TechCorp reported $75M in ARR. Reiterating, TechCorp confirmed $75M in ARR on the call.",
    );
    let out = extract(&text, &default_rules());
    assert_eq!(out.len(), 2);
    assert!(out[0].span.start < out[1].span.start);
}

#[test]
fn multiple_distinct_figures_in_one_article() {
    let text = normalize(
        "AlphaSoft reported $75M in ARR. Meanwhile BetaWorks posted revenue of $32 million.",
    );
    let out = extract(&text, &default_rules());
    assert_eq!(out.len(), 2);
    assert!((out[0].value_millions - 75.0).abs() < 1e-9);
    assert!((out[1].value_millions - 32.0).abs() < 1e-9);
}
