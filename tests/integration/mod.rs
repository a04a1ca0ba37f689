//! End-to-end crawls of an in-memory odds site.
//!
//! The site menu lists a sport whose page fails to load ahead of Soccer and
//! Tennis. Soccer lists a league whose page fails to load ahead of a healthy
//! league (with an excluded market and a fair market). Tennis has a single
//! league with a game in play.

use std::fs;

use odds_arb::config::Config;
use odds_arb::crawl::{Crawler, Scope, SkipReason};
use odds_arb::page::mock::{listing_page, with_in_play_marker};
use odds_arb::page::{MarketPageBuilder, MockPageProvider, OddsCell, PageElement};
use odds_arb::sink::{load_opportunities, MemorySink, OpportunityCollector, ReportWriter};
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;

const HOME: &str = "https://odds.test/";
const H2H: &str = "https://odds.test/soccer/epl/arsenal-v-chelsea/h2h";
const LINE: &str = "https://odds.test/soccer/epl/arsenal-v-chelsea/line";
const MARGIN: &str = "https://odds.test/soccer/epl/arsenal-v-chelsea/margin";

fn config() -> Config {
    Config {
        home_url: HOME.to_string(),
        ..Config::default()
    }
}

fn arbitrage_market() -> PageElement {
    MarketPageBuilder::new()
        .bookmakers(&["Sportsbet", "TAB", "Ladbrokes"])
        .prices("Arsenal", &["2.10", "2.20", "2.05"])
        .row(
            "Chelsea",
            vec![
                OddsCell::Price("2.15"),
                OddsCell::NotParticipating("3.50"),
                OddsCell::Price("1.80"),
            ],
        )
        .build()
}

fn fair_market() -> PageElement {
    MarketPageBuilder::new()
        .bookmakers(&["Sportsbet", "TAB"])
        .prices("Arsenal -0.5", &["1.90", "1.88"])
        .prices("Chelsea +0.5", &["1.90", "1.92"])
        .build()
}

fn odds_site() -> MockPageProvider {
    let site = MockPageProvider::new();
    site.add_page(
        HOME,
        listing_page(
            "sport-menu__link",
            &[
                ("Racing", "/racing/"),
                ("Soccer", "/soccer/"),
                ("Tennis", "/tennis/"),
            ],
        ),
    );
    site.fail_url("https://odds.test/racing/");

    site.add_page(
        "https://odds.test/soccer/",
        listing_page(
            "league-component",
            &[("A-League", "/soccer/a-league/"), ("EPL", "/soccer/epl/")],
        ),
    );
    site.add_page(
        "https://odds.test/soccer/epl",
        listing_page(
            "meeting head-to-head draw",
            &[
                ("Head to Head", "/soccer/epl/arsenal-v-chelsea/h2h"),
                ("Half Time Winning Margin", "/soccer/epl/arsenal-v-chelsea/margin"),
                ("Line", "/soccer/epl/arsenal-v-chelsea/line"),
            ],
        ),
    );
    site.add_page(H2H, arbitrage_market());
    site.add_page(LINE, fair_market());
    site.add_page(MARGIN, arbitrage_market());
    site.fail_url("https://odds.test/soccer/a-league");

    site.add_page(
        "https://odds.test/tennis/",
        listing_page("league-component", &[("ATP", "/tennis/atp/")]),
    );
    site.add_page(
        "https://odds.test/tennis/atp",
        with_in_play_marker(listing_page(
            "meeting head-to-head draw",
            &[("Match Winner", "/tennis/atp/match")],
        )),
    );
    site
}

#[tokio::test]
async fn full_crawl_of_mock_site() {
    let site = odds_site();
    let dir = tempfile::tempdir().unwrap();
    let html_path = dir.path().join("results.html");
    let json_path = dir.path().join("results.json");
    let memory = MemorySink::new();
    let mut collector = OpportunityCollector::new()
        .with_sink(ReportWriter::new(&html_path).with_json(&json_path))
        .with_sink(memory.clone());

    let crawler = Crawler::new(site.clone(), config());
    let summary = crawler.run(&mut collector).await.unwrap();

    // Failing sport and league are skipped without stopping the siblings
    // listed after them; the in-play league is skipped by policy.
    assert_eq!(summary.sports, 2);
    assert_eq!(summary.leagues, 2);
    assert_eq!(summary.markets_evaluated, 2);
    assert_eq!(summary.opportunities, 1);
    assert_eq!(summary.failures(), 2);

    let sports: Vec<_> = summary.skipped_at(Scope::Sport).collect();
    assert_eq!(sports.len(), 1);
    assert_eq!(sports[0].name, "Racing");
    assert!(matches!(sports[0].reason, SkipReason::Fetch(_)));

    let leagues: Vec<_> = summary.skipped_at(Scope::League).collect();
    assert_eq!(leagues.len(), 2);
    assert_eq!(leagues[0].name, "A-League");
    assert!(matches!(leagues[0].reason, SkipReason::Fetch(_)));
    assert_eq!(leagues[1].name, "ATP");
    assert_eq!(leagues[1].reason, SkipReason::InPlay);

    // Excluded markets are never requested; in-play markets neither.
    assert_eq!(site.request_count(MARGIN), 0);
    assert_eq!(site.request_count("https://odds.test/tennis/atp/match"), 0);

    let found = &collector.opportunities()[0];
    assert_eq!(found.name, "EPL: Head to Head");
    assert_eq!(found.url, H2H);
    assert_eq!(found.profit, dec!(8.74));
    assert_eq!(
        found
            .instructions
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<_>>(),
        vec![
            "BET 49.43 on selection Arsenal on website TAB at odds 6/5.".to_string(),
            "BET 50.57 on selection Chelsea on website Sportsbet at odds 23/20.".to_string(),
        ]
    );

    let html = fs::read_to_string(&html_path).unwrap();
    assert!(html.contains("<td>EPL</td><td>Head to Head</td><td>8.74</td>"));
    let saved = load_opportunities(&json_path).unwrap();
    assert_eq!(saved, collector.opportunities());
    assert!(!memory.publications()[0].suppressed);
}

#[tokio::test]
async fn reverification_drops_closed_opportunities() {
    let site = odds_site();
    let dir = tempfile::tempdir().unwrap();
    let html_path = dir.path().join("results.html");
    let memory = MemorySink::new();
    let mut collector = OpportunityCollector::new()
        .with_sink(ReportWriter::new(&html_path))
        .with_sink(memory.clone());
    let crawler = Crawler::new(site.clone(), config());
    crawler.run(&mut collector).await.unwrap();
    assert_eq!(collector.len(), 1);

    // Still open: rediscovered quietly under the same name.
    let summary = crawler.reverify(&mut collector).await;
    assert_eq!(summary.opportunities, 1);
    assert_eq!(collector.opportunities()[0].name, "EPL: Head to Head");
    assert!(memory.publications()[1].suppressed);

    // Prices moved: the opportunity disappears from the report.
    site.add_page(H2H, fair_market());
    let summary = crawler.reverify(&mut collector).await;
    assert_eq!(summary.opportunities, 0);
    assert!(collector.is_empty());
    assert!(fs::read_to_string(&html_path)
        .unwrap()
        .contains("No opportunities found."));
}

#[tokio::test]
async fn in_play_leagues_crawled_when_enabled() {
    let site = odds_site();
    site.add_page("https://odds.test/tennis/atp/match", arbitrage_market());
    let config = Config {
        include_in_play: true,
        ..config()
    };
    let mut collector = OpportunityCollector::new();

    let summary = Crawler::new(site, config)
        .run(&mut collector)
        .await
        .unwrap();

    assert_eq!(summary.leagues, 2);
    assert_eq!(summary.opportunities, 2);
    assert_eq!(collector.opportunities()[1].name, "ATP: Match Winner");
}

#[tokio::test]
async fn concurrent_market_fetches_report_in_listing_order() {
    let site = odds_site();
    let markets = [
        ("Head to Head", H2H, 0),
        ("Draw No Bet", "https://odds.test/soccer/epl/arsenal-v-chelsea/dnb", 40),
        ("Double Chance", "https://odds.test/soccer/epl/arsenal-v-chelsea/dc", 80),
    ];
    site.add_page(
        "https://odds.test/soccer/epl",
        listing_page(
            "meeting head-to-head draw",
            &markets.map(|(name, url, _)| (name, url)),
        ),
    );
    for (_, url, delay) in markets {
        site.add_page(url, arbitrage_market());
        site.delay_url(url, delay);
    }
    let config = Config {
        market_concurrency: 3,
        ..config()
    };
    let mut collector = OpportunityCollector::new();

    let summary = Crawler::new(site.clone(), config)
        .run(&mut collector)
        .await
        .unwrap();

    // Loads finish fastest first while results keep reversed listing order.
    let finished: Vec<_> = site
        .completions()
        .into_iter()
        .filter(|url| url.starts_with("https://odds.test/soccer/epl/"))
        .collect();
    assert_eq!(finished, markets.map(|(_, url, _)| url.to_string()).to_vec());

    assert_eq!(summary.markets_evaluated, 3);
    assert_eq!(summary.opportunities, 3);
    let names: Vec<_> = collector
        .opportunities()
        .iter()
        .map(|o| o.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec!["EPL: Double Chance", "EPL: Draw No Bet", "EPL: Head to Head"]
    );
}
