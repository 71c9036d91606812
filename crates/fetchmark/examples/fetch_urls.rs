//! Example: Fetch various URLs and display outcomes
//!
//! Run with: cargo run -p fetchmark --example fetch_urls
//!
//! This example demonstrates the variation fallback chain and Markdown
//! conversion against live endpoints.

use fetchmark::{fetch, FetchOutcome};

/// Test case definition
struct TestCase {
    url: &'static str,
    description: &'static str,
    expect_contains: Option<&'static str>,
}

/// Define test cases here
const TEST_CASES: &[TestCase] = &[
    TestCase {
        url: "https://example.com",
        description: "Simple HTML page, converted to Markdown",
        expect_contains: Some("Example Domain"),
    },
    TestCase {
        url: "https://httpbin.org/json",
        description: "JSON endpoint, left raw",
        expect_contains: Some("slideshow"),
    },
    TestCase {
        url: "https://httpbin.org/html",
        description: "HTML endpoint",
        expect_contains: Some("Herman Melville"),
    },
    TestCase {
        url: "https://example.com:443/page/",
        description: "Non-canonical URL form, recovered via variations",
        expect_contains: None,
    },
];

#[tokio::main]
async fn main() {
    println!("Fetchmark URL Examples");
    println!("======================\n");

    let mut passed = 0;
    let mut failed = 0;

    for (i, case) in TEST_CASES.iter().enumerate() {
        println!("{}. {}", i + 1, case.description);
        println!("   URL: {}", case.url);

        match fetch(case.url).await {
            Ok(FetchOutcome::Success(success)) => {
                println!("   Status: {}", success.status);
                println!("   Resolved: {}", success.url);
                println!("   Duration: {}ms", success.duration_ms);

                let preview: String = success.content.chars().take(100).collect();
                println!("   Preview: {}", preview.replace('\n', " "));

                let ok = case
                    .expect_contains
                    .map(|expected| success.content.contains(expected))
                    .unwrap_or(true);
                if ok {
                    println!("   ✓ PASS\n");
                    passed += 1;
                } else {
                    println!("   ✗ FAIL (expected content missing)\n");
                    failed += 1;
                }
            }
            Ok(FetchOutcome::Failure(failure)) => {
                println!("   Failed: {}", failure.message);
                println!("   Attempted: {:?}", failure.attempted_urls);
                println!("   ✗ FAIL\n");
                failed += 1;
            }
            Err(e) => {
                println!("   Error: {}", e);
                println!("   ✗ FAIL\n");
                failed += 1;
            }
        }
    }

    println!("======================");
    println!("Results: {} passed, {} failed", passed, failed);

    if failed > 0 {
        std::process::exit(1);
    }
}
