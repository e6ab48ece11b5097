//! Graph-guided expansion sessions.
//!
//! A session seeds the concept graph, then repeatedly picks an anchor node, asks for new
//! questions about its neighborhood, answers the unseen ones and feeds them back into the
//! graph. It ends when the dataset reaches its target, when expansion stalls, or when the
//! caller cancels. Only configuration problems are raised; everything else is logged,
//! counted and skipped.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::LLMProvider;
use crate::answer::{AnswerRouter, AnswerSource, ContextRetriever};
use crate::dataset::{QAPair, SeedQuery};
use crate::element::SemanticElement;
use crate::error::{Error, Result};
use crate::extraction::{ElementExtractor, ExtractionService};
use crate::generation::{QuestionGenerator, SeenQuestions};
use crate::graph::{ConceptGraph, NodeId};

/// Shared stop signal, checked between rounds and between questions.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// External collaborators of a session. Cloning shares the underlying clients.
#[derive(Clone)]
pub struct ServiceHandles {
    pub llm: Arc<dyn LLMProvider>,
    pub extraction: Arc<dyn ExtractionService>,
    pub search: Option<Arc<dyn ContextRetriever>>,
    pub datastore: Option<Arc<dyn ContextRetriever>>,
}

impl ServiceHandles {
    #[must_use]
    pub fn new(llm: Arc<dyn LLMProvider>, extraction: Arc<dyn ExtractionService>) -> Self {
        Self {
            llm,
            extraction,
            search: None,
            datastore: None,
        }
    }

    #[must_use]
    pub fn with_search(mut self, search: Arc<dyn ContextRetriever>) -> Self {
        self.search = Some(search);
        self
    }

    #[must_use]
    pub fn with_datastore(mut self, datastore: Arc<dyn ContextRetriever>) -> Self {
        self.datastore = Some(datastore);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpansionConfig {
    pub domain: String,
    /// Dataset size at which the session stops.
    pub target_count: usize,
    pub questions_per_round: usize,
    pub source: AnswerSource,
    pub top_k_related: usize,
    pub min_edge_weight: u64,
    /// How many top-ranked nodes compete for the anchor slot.
    pub anchor_pool: usize,
    pub max_stall_rounds: u32,
    /// Expansion round budget; exhausting it ends the session as cancelled.
    pub max_rounds: Option<u32>,
    pub answer_seeds: bool,
    pub context_passages: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            domain: "general".to_string(),
            target_count: 15,
            questions_per_round: 5,
            source: AnswerSource::Llm,
            top_k_related: 5,
            min_edge_weight: 1,
            anchor_pool: 10,
            max_stall_rounds: 3,
            max_rounds: None,
            answer_seeds: true,
            context_passages: 5,
        }
    }
}

impl ExpansionConfig {
    #[must_use]
    pub fn for_domain(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ..Self::default()
        }
    }

    fn validate(&self, seeds: &[SeedQuery]) -> Result<()> {
        if self.domain.trim().is_empty() {
            return Err(Error::config("domain must not be empty"));
        }
        if self.domain.contains(['/', '\\']) || self.domain == "." || self.domain == ".." {
            return Err(Error::config(format!(
                "domain '{}' cannot be used as a file name",
                self.domain
            )));
        }
        if seeds.is_empty() {
            return Err(Error::config("at least one seed query is required"));
        }
        let mut ids = HashSet::new();
        for seed in seeds {
            if seed.id.trim().is_empty() {
                return Err(Error::config("seed ids must not be empty"));
            }
            if seed.text.trim().is_empty() {
                return Err(Error::config(format!("seed {} has empty text", seed.id)));
            }
            if !ids.insert(seed.id.as_str()) {
                return Err(Error::config(format!("duplicate seed id: {}", seed.id)));
            }
        }
        if self.target_count == 0 {
            return Err(Error::config("target count must be greater than zero"));
        }
        if self.questions_per_round == 0 {
            return Err(Error::config("questions per round must be greater than zero"));
        }
        if self.max_stall_rounds == 0 {
            return Err(Error::config("max stall rounds must be greater than zero"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Seeding,
    Expanding,
    Terminated,
    Stalled,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    TargetReached,
    Stalled,
    Cancelled,
}

impl TerminationReason {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TargetReached => "target_reached",
            Self::Stalled => "stalled",
            Self::Cancelled => "cancelled",
        }
    }

    const fn final_state(self) -> SessionState {
        match self {
            Self::TargetReached => SessionState::Terminated,
            Self::Stalled => SessionState::Stalled,
            Self::Cancelled => SessionState::Cancelled,
        }
    }
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recoverable failures a session skipped over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipCounts {
    pub extraction_failures: usize,
    pub generation_failures: usize,
    pub answer_failures: usize,
    /// Questions rejected because an equal question was already seen.
    pub duplicate_questions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub domain: String,
    pub reason: TerminationReason,
    pub state: SessionState,
    /// Completed expansion rounds, seeding excluded.
    pub rounds: u32,
    pub pairs: usize,
    pub skips: SkipCounts,
    /// Answers recorded as `llm` although a grounded source was requested.
    pub fallbacks: usize,
    pub node_count: usize,
    pub edge_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ExpansionReport {
    pub summary: RunSummary,
    pub dataset: Vec<QAPair>,
    pub graph: ConceptGraph,
}

pub struct ExpansionOrchestrator {
    config: ExpansionConfig,
    llm: Arc<dyn LLMProvider>,
    extractor: ElementExtractor,
    generator: QuestionGenerator,
    router: AnswerRouter,
    cancel: CancellationFlag,

    state: SessionState,
    graph: ConceptGraph,
    seen: SeenQuestions,
    dataset: Vec<QAPair>,
    last_expanded: HashMap<NodeId, u32>,
    round: u32,
    stall_rounds: u32,
    skips: SkipCounts,
    fallbacks: usize,
}

impl ExpansionOrchestrator {
    #[must_use]
    pub fn new(services: &ServiceHandles, config: ExpansionConfig) -> Self {
        let router = AnswerRouter::new(services.llm.clone())
            .with_search(services.search.clone())
            .with_datastore(services.datastore.clone())
            .with_context_passages(config.context_passages);

        Self {
            llm: services.llm.clone(),
            extractor: ElementExtractor::new(services.extraction.clone()),
            generator: QuestionGenerator::new(services.llm.clone()),
            router,
            cancel: CancellationFlag::new(),
            config,
            state: SessionState::Seeding,
            graph: ConceptGraph::new(),
            seen: SeenQuestions::new(),
            dataset: Vec::new(),
            last_expanded: HashMap::new(),
            round: 0,
            stall_rounds: 0,
            skips: SkipCounts::default(),
            fallbacks: 0,
        }
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ExpansionConfig {
        &self.config
    }

    /// Run the session to completion.
    ///
    /// Fails only with `Error::Configuration`, before any extraction, generation or
    /// answer call is made.
    pub async fn run(mut self, seeds: &[SeedQuery]) -> Result<ExpansionReport> {
        let started_at = Utc::now();
        self.preflight(seeds).await?;

        info!(
            "Starting expansion for domain '{}' with {} seeds, target {}",
            self.config.domain,
            seeds.len(),
            self.config.target_count
        );

        let reason = match self.seed(seeds).await {
            Some(reason) => reason,
            None => {
                self.transition(SessionState::Expanding);
                self.expand().await
            }
        };
        self.transition(reason.final_state());

        Ok(self.finish(reason, started_at))
    }

    async fn preflight(&self, seeds: &[SeedQuery]) -> Result<()> {
        self.config.validate(seeds)?;
        self.llm.health_check().await.map_err(|e| {
            Error::config(format!("completion service health check failed: {e}"))
        })
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session state {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn target_reached(&self) -> bool {
        self.dataset.len() >= self.config.target_count
    }

    /// Cancellation or an exhausted round budget.
    fn interrupted(&self) -> bool {
        if self.cancel.is_cancelled() {
            info!("Expansion cancelled after {} rounds", self.round);
            return true;
        }
        if self.config.max_rounds.is_some_and(|max| self.round >= max) {
            info!("Round budget of {} exhausted", self.round);
            return true;
        }
        false
    }

    async fn seed(&mut self, seeds: &[SeedQuery]) -> Option<TerminationReason> {
        for seed in seeds {
            if self.cancel.is_cancelled() {
                info!("Expansion cancelled while seeding");
                return Some(TerminationReason::Cancelled);
            }

            let fresh = self.seen.insert(&seed.text);
            if !fresh {
                warn!("Seed {} repeats an earlier seed question", seed.id);
                self.skips.duplicate_questions += 1;
            }

            self.ingest(&seed.id, &seed.text).await;

            if fresh && self.config.answer_seeds && !self.target_reached() {
                self.answer_into_dataset(&seed.id, &seed.text).await;
            }
        }

        info!(
            "Seeded graph with {} nodes and {} edges; dataset has {} pairs",
            self.graph.node_count(),
            self.graph.edge_count(),
            self.dataset.len()
        );

        self.target_reached()
            .then_some(TerminationReason::TargetReached)
    }

    async fn expand(&mut self) -> TerminationReason {
        loop {
            if self.target_reached() {
                return TerminationReason::TargetReached;
            }
            if self.interrupted() {
                return TerminationReason::Cancelled;
            }

            let produced = self.expansion_round().await;
            self.round += 1;

            if self.target_reached() {
                return TerminationReason::TargetReached;
            }
            if self.cancel.is_cancelled() {
                return TerminationReason::Cancelled;
            }

            if produced > 0 {
                self.stall_rounds = 0;
                continue;
            }
            self.stall_rounds += 1;
            warn!(
                "Round {} produced no new pairs ({}/{} stalled rounds)",
                self.round, self.stall_rounds, self.config.max_stall_rounds
            );
            if self.stall_rounds >= self.config.max_stall_rounds {
                return TerminationReason::Stalled;
            }
        }
    }

    /// One generate-answer-extract pass. Returns the number of pairs appended.
    async fn expansion_round(&mut self) -> usize {
        let round = self.round + 1;
        let Some(anchor) = self.select_anchor() else {
            warn!("Round {}: graph is empty, nothing to expand", round);
            return 0;
        };
        self.last_expanded.insert(NodeId::of(&anchor), round);

        let mut context = vec![anchor];
        let related = self.graph.related_elements(
            &context[0],
            self.config.top_k_related,
            self.config.min_edge_weight,
        );
        context.extend(related);
        debug!(
            "Round {}: anchor '{}' with {} related elements",
            round,
            context[0].text,
            context.len() - 1
        );

        let batch = match self
            .generator
            .generate(
                &context,
                self.config.questions_per_round,
                Some(self.config.domain.as_str()),
                &self.seen,
                round,
            )
            .await
        {
            Ok(batch) => batch,
            Err(e) => {
                warn!("Round {}: {e}", round);
                self.skips.generation_failures += 1;
                return 0;
            }
        };

        self.skips.duplicate_questions += batch.duplicates;

        let mut produced = 0;
        for question in batch.questions {
            if self.target_reached() || self.cancel.is_cancelled() {
                break;
            }
            if !self.seen.insert(&question.text) {
                self.skips.duplicate_questions += 1;
                continue;
            }
            if self.answer_into_dataset(&question.id, &question.text).await {
                produced += 1;
            }
            self.ingest(&question.id, &question.text).await;
        }

        info!(
            "Round {}: {} new pairs, dataset has {}/{}",
            round,
            produced,
            self.dataset.len(),
            self.config.target_count
        );
        produced
    }

    /// Least recently expanded node among the top-ranked pool; never-expanded nodes first.
    fn select_anchor(&self) -> Option<SemanticElement> {
        self.graph
            .highest_weight_nodes(self.config.anchor_pool.max(1))
            .into_iter()
            .enumerate()
            .min_by_key(|(rank, node)| (self.last_expanded.get(&node.id).copied(), *rank))
            .map(|(_, node)| node.element())
    }

    async fn ingest(&mut self, query_id: &str, text: &str) {
        match self.extractor.extract(query_id, text).await {
            Ok(elements) => self.graph.add_query_elements(query_id, &elements),
            Err(e) => {
                warn!("Query {}: {e}", query_id);
                self.skips.extraction_failures += 1;
            }
        }
    }

    async fn answer_into_dataset(&mut self, query_id: &str, question: &str) -> bool {
        let answer = match self
            .router
            .answer(question, self.config.source, Some(self.config.domain.as_str()))
            .await
        {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Query {}: {e}", query_id);
                self.skips.answer_failures += 1;
                return false;
            }
        };

        if answer.source != self.config.source {
            self.fallbacks += 1;
        }
        debug!("Query {} answered via {}", query_id, answer.source);

        self.dataset.push(QAPair {
            question: question.trim().to_string(),
            answer: answer.text,
            source: answer.source,
            domain: self.config.domain.clone(),
            query_id: query_id.to_string(),
        });
        true
    }

    fn finish(self, reason: TerminationReason, started_at: DateTime<Utc>) -> ExpansionReport {
        let summary = RunSummary {
            domain: self.config.domain.clone(),
            reason,
            state: self.state,
            rounds: self.round,
            pairs: self.dataset.len(),
            skips: self.skips,
            fallbacks: self.fallbacks,
            node_count: self.graph.node_count(),
            edge_count: self.graph.edge_count(),
            started_at,
            finished_at: Utc::now(),
        };

        info!(
            "Expansion for '{}' ended ({}) after {} rounds with {} pairs",
            summary.domain, summary.reason, summary.rounds, summary.pairs
        );

        ExpansionReport {
            summary,
            dataset: self.dataset,
            graph: self.graph,
        }
    }
}

/// Run one independent session per domain over shared service handles.
///
/// Each domain gets its own graph and seen set; `config.domain` is replaced by the domain
/// name. Results come back in input order and are never merged. Domains not started before
/// cancellation are left out.
pub async fn expand_domains(
    services: &ServiceHandles,
    config: &ExpansionConfig,
    domains: Vec<(String, Vec<SeedQuery>)>,
    cancel: &CancellationFlag,
) -> Vec<(String, Result<ExpansionReport>)> {
    let mut results = Vec::with_capacity(domains.len());

    for (domain, seeds) in domains {
        if cancel.is_cancelled() {
            info!("Skipping remaining domains after cancellation");
            break;
        }

        let domain_config = ExpansionConfig {
            domain: domain.clone(),
            ..config.clone()
        };
        let result = ExpansionOrchestrator::new(services, domain_config)
            .with_cancellation(cancel.clone())
            .run(&seeds)
            .await;
        if let Err(e) = &result {
            warn!("Domain '{}' failed: {e}", domain);
        }
        results.push((domain, result));
    }

    results
}
