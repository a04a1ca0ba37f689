//! Depth-first traversal from the sport menu down to market odds tables.

use futures::{stream, StreamExt};
use tracing::{debug, info, instrument, warn};

use super::types::{
    CrawlNode, CrawlProgress, CrawlSummary, NodeOutcome, Scope, SkipReason, SkippedNode,
};
use crate::arbitrage::calculator::NAME_SEPARATOR;
use crate::arbitrage::{detector, ArbitrageOpportunity};
use crate::config::Config;
use crate::error::CrawlError;
use crate::metrics;
use crate::page::{resolve_link, Page, PageElement, PageProvider};
use crate::sink::OpportunityCollector;

/// Link attribute on listing elements.
pub const LINK_ATTR: &str = "href";
/// Classes of sport links in the home page menu.
pub const SPORT_CLASSES: &str = "sport-menu__link";
/// Classes of league links on a sport page.
pub const LEAGUE_CLASSES: &str = "league-component";
/// Classes marking a game in play on a league page.
pub const IN_PLAY_CLASSES: &str = "no-arrow in-play";
/// Classes of market links on a league page.
pub const MARKET_CLASSES: &str = "meeting head-to-head draw";

/// Walks the site and feeds opportunities to a collector.
#[derive(Debug, Clone)]
pub struct Crawler<P> {
    provider: P,
    config: Config,
    progress: CrawlProgress,
}

/// Outcome of evaluating one market page.
pub type MarketResult = Result<Option<ArbitrageOpportunity>, SkipReason>;

impl<P: PageProvider> Crawler<P> {
    /// Create a crawler over `provider`.
    pub fn new(provider: P, config: Config) -> Self {
        Self {
            provider,
            config,
            progress: CrawlProgress::new(),
        }
    }

    /// Report progress through a shared handle.
    pub fn with_progress(mut self, progress: CrawlProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Crawl the whole site once.
    ///
    /// Only an unreachable home page fails the run; every other failure is
    /// recorded in the summary and the crawl moves on to the next sibling.
    #[instrument(skip_all, fields(home = %self.config.home_url))]
    pub async fn run(
        &self,
        collector: &mut OpportunityCollector,
    ) -> Result<CrawlSummary, CrawlError> {
        self.progress.set_running(true);
        let result = self.crawl_root(collector).await;
        self.progress.set_running(false);
        result
    }

    async fn crawl_root(
        &self,
        collector: &mut OpportunityCollector,
    ) -> Result<CrawlSummary, CrawlError> {
        let home = self
            .provider
            .fetch(&self.config.home_url, "home")
            .await
            .map_err(CrawlError::RootUnavailable)?;

        let mut summary = CrawlSummary::default();
        let sports = self.listing(&home, SPORT_CLASSES, Scope::Sport, &mut summary);
        info!(sports = sports.len(), "Crawl started");

        for sport in &sports {
            debug!(sport = %sport.name, link = %sport.link, "Examining sport");
            let outcome = self.crawl_sport(sport, collector, &mut summary).await;
            if let NodeOutcome::Skipped(reason) = outcome {
                self.skip(&mut summary, sport.scope, &sport.name, Some(&sport.url), reason);
            }
        }

        info!(
            sports = summary.sports,
            leagues = summary.leagues,
            markets = summary.markets_evaluated,
            opportunities = summary.opportunities,
            skipped = summary.skipped.len(),
            failures = summary.failures(),
            "Crawl finished"
        );
        Ok(summary)
    }

    async fn crawl_sport(
        &self,
        sport: &CrawlNode,
        collector: &mut OpportunityCollector,
        summary: &mut CrawlSummary,
    ) -> NodeOutcome {
        let page = match self.provider.fetch(&sport.url, &sport.name).await {
            Ok(page) => page,
            Err(e) => return NodeOutcome::Skipped(SkipReason::Fetch(e)),
        };
        summary.sports += 1;
        self.progress.sport();

        let leagues = self.listing(&page, LEAGUE_CLASSES, Scope::League, summary);
        for league in &leagues {
            debug!(league = %league.name, link = %league.link, "Examining league");
            let outcome = self.crawl_league(league, collector, summary).await;
            if let NodeOutcome::Skipped(reason) = outcome {
                self.skip(summary, league.scope, &league.name, Some(&league.url), reason);
            }
        }

        NodeOutcome::Visited {
            children: leagues.len(),
        }
    }

    #[instrument(skip_all, fields(league = %league.name))]
    async fn crawl_league(
        &self,
        league: &CrawlNode,
        collector: &mut OpportunityCollector,
        summary: &mut CrawlSummary,
    ) -> NodeOutcome {
        let page = match self.provider.fetch(&league.url, &league.name).await {
            Ok(page) => page,
            Err(e) => return NodeOutcome::Skipped(SkipReason::Fetch(e)),
        };
        summary.leagues += 1;
        self.progress.league();

        if !self.config.include_in_play && page.first_by_class(IN_PLAY_CLASSES).is_some() {
            return NodeOutcome::Skipped(SkipReason::InPlay);
        }

        let mut markets = Vec::new();
        for node in self.listing(&page, MARKET_CLASSES, Scope::Market, summary) {
            if self.config.is_excluded_market(&node.name) {
                let reason = SkipReason::Excluded;
                self.skip(summary, Scope::Market, &node.name, Some(&node.url), reason);
            } else {
                markets.push(node);
            }
        }
        // Most recently listed markets first.
        markets.reverse();

        let game = page.name.clone();
        let mut evaluations = stream::iter(markets.iter().map(|market| {
            let label = format!("{}{}{}", game, NAME_SEPARATOR, market.name);
            async move {
                let result = self.check_market(&label, &market.url).await;
                (market, label, result)
            }
        }))
        .buffered(self.config.market_concurrency.max(1));

        while let Some((market, label, result)) = evaluations.next().await {
            self.settle_market(collector, summary, &label, &market.url, result, false);
        }

        NodeOutcome::Visited {
            children: markets.len(),
        }
    }

    /// Fetch and evaluate one market page, labelled `name`.
    #[instrument(skip(self))]
    pub async fn check_market(&self, name: &str, url: &str) -> MarketResult {
        debug!("Considering market");
        let page = self
            .provider
            .fetch(url, name)
            .await
            .map_err(SkipReason::Fetch)?;
        detector::check_market(&page, &self.config).map_err(SkipReason::Parse)
    }

    /// Evaluate one market page and record any opportunity, announcing it.
    pub async fn check_single(
        &self,
        name: &str,
        url: &str,
        collector: &mut OpportunityCollector,
    ) -> NodeOutcome {
        let result = self.check_market(name, url).await;
        let mut summary = CrawlSummary::default();
        self.settle_market(collector, &mut summary, name, url, result, false)
    }

    /// Re-check every accumulated opportunity.
    ///
    /// The collector is cleared first; opportunities still present are
    /// recorded again with notifications suppressed, so the report ends up
    /// listing only the ones that survived.
    #[instrument(skip_all)]
    pub async fn reverify(&self, collector: &mut OpportunityCollector) -> CrawlSummary {
        let targets = collector.take_targets();
        info!(targets = targets.len(), "Re-verifying opportunities");

        let mut summary = CrawlSummary::default();
        for (name, url) in &targets {
            let result = self.check_market(name, url).await;
            self.settle_market(collector, &mut summary, name, url, result, true);
        }

        info!(
            checked = targets.len(),
            still_open = summary.opportunities,
            "Re-verification finished"
        );
        summary
    }

    fn settle_market(
        &self,
        collector: &mut OpportunityCollector,
        summary: &mut CrawlSummary,
        name: &str,
        url: &str,
        result: MarketResult,
        suppress: bool,
    ) -> NodeOutcome {
        match result {
            Ok(found) => {
                summary.markets_evaluated += 1;
                self.progress.market(found.is_some());
                let found = match found {
                    Some(opportunity) => {
                        summary.opportunities += 1;
                        collector.record(opportunity, suppress);
                        true
                    }
                    None => false,
                };
                NodeOutcome::Evaluated { found }
            }
            Err(reason) => {
                self.skip(summary, Scope::Market, name, Some(url), reason.clone());
                NodeOutcome::Skipped(reason)
            }
        }
    }

    /// Child nodes listed on `page`; elements without a usable link are
    /// recorded as skipped.
    fn listing(
        &self,
        page: &Page,
        classes: &str,
        scope: Scope,
        summary: &mut CrawlSummary,
    ) -> Vec<CrawlNode> {
        let mut nodes = Vec::new();
        for element in page.find_by_class(classes) {
            match self.node_from(element, scope) {
                Ok(node) => nodes.push(node),
                Err(reason) => {
                    self.skip(summary, scope, &element.display_name(), None, reason);
                }
            }
        }
        nodes
    }

    fn node_from(&self, element: &PageElement, scope: Scope) -> Result<CrawlNode, SkipReason> {
        let link = element.attr(LINK_ATTR).ok_or(SkipReason::MissingLink)?;
        let target = match scope {
            // League links are written relative to the site root.
            Scope::League => link.trim().trim_matches('/'),
            _ => link,
        };
        let url = resolve_link(&self.config.home_url, target).map_err(SkipReason::Fetch)?;

        Ok(CrawlNode {
            scope,
            name: element.display_name(),
            link: link.to_string(),
            url,
        })
    }

    fn skip(
        &self,
        summary: &mut CrawlSummary,
        scope: Scope,
        name: &str,
        url: Option<&str>,
        reason: SkipReason,
    ) {
        if reason.is_failure() {
            warn!(%scope, name, reason = %reason, "Skipping node");
        } else {
            debug!(%scope, name, reason = %reason, "Skipping node");
        }
        metrics::inc_nodes_skipped(reason.label());
        self.progress.skipped();
        summary.skipped.push(SkippedNode {
            scope,
            name: name.to_string(),
            url: url.map(str::to_string),
            reason,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::page::mock::{listing_page, with_in_play_marker};
    use crate::page::{MarketPageBuilder, MockPageProvider};
    use crate::sink::MemorySink;
    use pretty_assertions::assert_eq;

    const HOME: &str = "https://site/";

    fn config() -> Config {
        Config {
            home_url: HOME.to_string(),
            ..Config::default()
        }
    }

    fn arbitrage_market() -> PageElement {
        MarketPageBuilder::new()
            .bookmakers(&["Sportsbet", "TAB"])
            .prices("Home", &["2.10", "2.20"])
            .prices("Away", &["2.15", "1.80"])
            .build()
    }

    fn fair_market() -> PageElement {
        MarketPageBuilder::new()
            .bookmakers(&["Sportsbet", "TAB"])
            .prices("Home", &["1.90", "1.85"])
            .prices("Away", &["1.90", "1.95"])
            .build()
    }

    /// One sport with one league listing two markets.
    fn site() -> MockPageProvider {
        let provider = MockPageProvider::new();
        provider.add_page(HOME, listing_page(SPORT_CLASSES, &[("Soccer", "/soccer/")]));
        provider.add_page(
            "https://site/soccer/",
            listing_page(LEAGUE_CLASSES, &[("EPL", "/soccer/epl/")]),
        );
        provider.add_page(
            "https://site/soccer/epl",
            listing_page(
                MARKET_CLASSES,
                &[
                    ("Head to Head", "/soccer/epl/a-v-b/h2h"),
                    ("Line", "/soccer/epl/a-v-b/line"),
                ],
            ),
        );
        provider.add_page("https://site/soccer/epl/a-v-b/h2h", arbitrage_market());
        provider.add_page("https://site/soccer/epl/a-v-b/line", fair_market());
        provider
    }

    #[tokio::test]
    async fn crawl_finds_opportunity_with_composite_name() {
        let provider = site();
        let memory = MemorySink::new();
        let mut collector = OpportunityCollector::new().with_sink(memory.clone());
        let crawler = Crawler::new(provider.clone(), config());

        let summary = crawler.run(&mut collector).await.unwrap();

        assert_eq!(summary.sports, 1);
        assert_eq!(summary.leagues, 1);
        assert_eq!(summary.markets_evaluated, 2);
        assert_eq!(summary.opportunities, 1);
        assert!(summary.skipped.is_empty());

        let found = &collector.opportunities()[0];
        assert_eq!(found.name, "EPL: Head to Head");
        assert_eq!(found.url, "https://site/soccer/epl/a-v-b/h2h");
        assert!(!memory.publications()[0].suppressed);
    }

    #[tokio::test]
    async fn markets_are_visited_in_reverse_listing_order() {
        let provider = site();
        let crawler = Crawler::new(provider.clone(), config());
        crawler.run(&mut OpportunityCollector::new()).await.unwrap();

        assert_eq!(
            provider.requests(),
            vec![
                "https://site/".to_string(),
                "https://site/soccer/".to_string(),
                "https://site/soccer/epl".to_string(),
                "https://site/soccer/epl/a-v-b/line".to_string(),
                "https://site/soccer/epl/a-v-b/h2h".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn excluded_markets_are_never_fetched() {
        let provider = site();
        let config = Config {
            excluded_markets: vec!["Line".to_string()],
            ..config()
        };
        let crawler = Crawler::new(provider.clone(), config);

        let summary = crawler.run(&mut OpportunityCollector::new()).await.unwrap();

        assert_eq!(provider.request_count("https://site/soccer/epl/a-v-b/line"), 0);
        assert_eq!(summary.markets_evaluated, 1);
        let skipped: Vec<_> = summary.skipped_at(Scope::Market).collect();
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].reason, SkipReason::Excluded);
    }

    #[tokio::test]
    async fn in_play_league_is_skipped_unless_enabled() {
        let provider = site();
        provider.add_page(
            "https://site/soccer/epl",
            with_in_play_marker(listing_page(
                MARKET_CLASSES,
                &[("Head to Head", "/soccer/epl/a-v-b/h2h")],
            )),
        );

        let crawler = Crawler::new(provider.clone(), config());
        let summary = crawler.run(&mut OpportunityCollector::new()).await.unwrap();
        assert_eq!(summary.markets_evaluated, 0);
        assert_eq!(summary.skipped[0].scope, Scope::League);
        assert_eq!(summary.skipped[0].reason, SkipReason::InPlay);

        let config = Config {
            include_in_play: true,
            ..config()
        };
        let crawler = Crawler::new(provider, config);
        let mut collector = OpportunityCollector::new();
        let summary = crawler.run(&mut collector).await.unwrap();
        assert_eq!(summary.markets_evaluated, 1);
        assert_eq!(collector.len(), 1);
    }

    #[tokio::test]
    async fn failing_market_does_not_stop_its_siblings() {
        let provider = site();
        provider.fail_url("https://site/soccer/epl/a-v-b/line");
        let crawler = Crawler::new(provider, config());
        let mut collector = OpportunityCollector::new();

        let summary = crawler.run(&mut collector).await.unwrap();

        assert_eq!(collector.len(), 1);
        assert_eq!(summary.failures(), 1);
        assert!(matches!(
            summary.skipped[0].reason,
            SkipReason::Fetch(FetchError::Status { status: 500, .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_home_fails_the_run() {
        let provider = MockPageProvider::new();
        let crawler = Crawler::new(provider, config());
        let result = crawler.run(&mut OpportunityCollector::new()).await;
        assert!(matches!(result, Err(CrawlError::RootUnavailable(_))));
    }

    #[tokio::test]
    async fn reverify_keeps_only_surviving_opportunities() {
        let provider = site();
        let memory = MemorySink::new();
        let mut collector = OpportunityCollector::new().with_sink(memory.clone());
        let crawler = Crawler::new(provider.clone(), config());
        crawler.run(&mut collector).await.unwrap();
        assert_eq!(collector.len(), 1);

        let summary = crawler.reverify(&mut collector).await;
        assert_eq!(summary.opportunities, 1);
        assert_eq!(collector.len(), 1);
        let publications = memory.publications();
        assert_eq!(publications.len(), 2);
        assert!(publications[1].suppressed);
        assert_eq!(memory.clears(), 1);

        provider.add_page("https://site/soccer/epl/a-v-b/h2h", fair_market());
        let summary = crawler.reverify(&mut collector).await;
        assert_eq!(summary.markets_evaluated, 1);
        assert_eq!(summary.opportunities, 0);
        assert!(collector.is_empty());
    }

    #[tokio::test]
    async fn check_single_records_opportunity() {
        let crawler = Crawler::new(site(), config());
        let mut collector = OpportunityCollector::new();

        let outcome = crawler
            .check_single("A v B: h2h", "https://site/soccer/epl/a-v-b/h2h", &mut collector)
            .await;

        assert_eq!(outcome, NodeOutcome::Evaluated { found: true });
        assert_eq!(collector.opportunities()[0].name, "A v B: h2h");
    }

    #[tokio::test]
    async fn failing_siblings_listed_first_do_not_stop_later_ones() {
        let provider = site();
        provider.add_page(
            HOME,
            listing_page(SPORT_CLASSES, &[("Bad", "/bad/"), ("Soccer", "/soccer/")]),
        );
        provider.add_page(
            "https://site/soccer/",
            listing_page(LEAGUE_CLASSES, &[("X", "/soccer/x/"), ("EPL", "/soccer/epl/")]),
        );
        provider.fail_url("https://site/bad/");
        provider.fail_url("https://site/soccer/x");
        let mut collector = OpportunityCollector::new();

        let summary = Crawler::new(provider, config())
            .run(&mut collector)
            .await
            .unwrap();

        assert_eq!(summary.sports, 1);
        assert_eq!(summary.leagues, 1);
        assert_eq!(summary.markets_evaluated, 2);
        assert_eq!(summary.opportunities, 1);
        assert_eq!(summary.failures(), 2);

        let sports: Vec<_> = summary.skipped_at(Scope::Sport).collect();
        assert_eq!(sports.len(), 1);
        assert_eq!(sports[0].name, "Bad");
        let leagues: Vec<_> = summary.skipped_at(Scope::League).collect();
        assert_eq!(leagues.len(), 1);
        assert_eq!(leagues[0].name, "X");
        assert_eq!(collector.opportunities()[0].name, "EPL: Head to Head");
    }

    #[tokio::test]
    async fn interleaved_market_fetches_settle_in_listing_order() {
        let provider = site();
        provider.add_page(
            "https://site/soccer/epl",
            listing_page(
                MARKET_CLASSES,
                &[
                    ("M1", "/soccer/epl/m1"),
                    ("M2", "/soccer/epl/m2"),
                    ("M3", "/soccer/epl/m3"),
                ],
            ),
        );
        for market in ["m1", "m2", "m3"] {
            provider.add_page(format!("https://site/soccer/epl/{}", market), arbitrage_market());
        }
        // The first market evaluated is the slowest to load.
        provider.delay_url("https://site/soccer/epl/m3", 120);
        provider.delay_url("https://site/soccer/epl/m2", 60);

        let config = Config {
            market_concurrency: 3,
            ..config()
        };
        let progress = CrawlProgress::new();
        let crawler = Crawler::new(provider.clone(), config).with_progress(progress.clone());
        let mut collector = OpportunityCollector::new();

        let summary = crawler.run(&mut collector).await.unwrap();

        let market_requests: Vec<_> = provider.requests().into_iter().skip(3).collect();
        assert_eq!(
            market_requests,
            vec![
                "https://site/soccer/epl/m3".to_string(),
                "https://site/soccer/epl/m2".to_string(),
                "https://site/soccer/epl/m1".to_string(),
            ]
        );
        let finished: Vec<_> = provider.completions().into_iter().skip(3).collect();
        assert_eq!(
            finished,
            vec![
                "https://site/soccer/epl/m1".to_string(),
                "https://site/soccer/epl/m2".to_string(),
                "https://site/soccer/epl/m3".to_string(),
            ]
        );

        assert_eq!(summary.opportunities, 3);
        let names: Vec<_> = collector
            .opportunities()
            .iter()
            .map(|o| o.name.as_str())
            .collect();
        assert_eq!(names, vec!["EPL: M3", "EPL: M2", "EPL: M1"]);

        let snapshot = progress.snapshot();
        assert!(!snapshot.running);
        assert_eq!(snapshot.markets, 3);
        assert_eq!(snapshot.opportunities, 3);
    }

    #[test]
    fn links_without_href_are_skipped() {
        let crawler = Crawler::new(MockPageProvider::new(), config());
        let page = Page::new(
            HOME,
            "home",
            PageElement::new("html")
                .with_child(PageElement::new("a").with_class(SPORT_CLASSES).with_text("Golf"))
                .with_child(
                    PageElement::new("a")
                        .with_class(SPORT_CLASSES)
                        .with_attr("href", "/tennis/")
                        .with_text(" Tennis "),
                ),
        );
        let mut summary = CrawlSummary::default();

        let nodes = crawler.listing(&page, SPORT_CLASSES, Scope::Sport, &mut summary);

        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].name, "Tennis");
        assert_eq!(nodes[0].url, "https://site/tennis/");
        assert_eq!(summary.skipped[0].reason, SkipReason::MissingLink);
    }
}
