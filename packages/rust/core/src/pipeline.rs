//! End-to-end discovery run: companies → websites → emails → names →
//! profiles → validated, deduplicated decision-makers.
//!
//! Two nested bounded pools do the work: an outer pool over companies
//! (`company_concurrency` wide) and, per company, an inner pool over that
//! company's emails (`email_concurrency` wide). Workers never touch the sink;
//! they send [`Event`]s over a channel to a single aggregator, which owns the
//! summary counters and the output stream.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use prospector_extract::{IndustryClassifier, TitleValidator, Verdict, extract_contact};
use prospector_search::{EmailFinder, SearchProvider};
use prospector_shared::{
    CompanyRecord, DecisionMaker, EmailCandidate, MIN_PERSON_CONFIDENCE, PipelineConfig, Result,
    RunId,
};
use prospector_storage::Storage;
use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::dedup::DedupSet;
use crate::emails::{CompanyEmailFinder, candidates};
use crate::limiter::RateLimiter;
use crate::person::PersonResolver;
use crate::retry::RetryPolicy;
use crate::website::WebsiteResolver;

// ---------------------------------------------------------------------------
// Public surface
// ---------------------------------------------------------------------------

/// Receives each validated contact exactly once, from the aggregator.
pub trait ContactSink: Send + Sync {
    fn accept(&self, contact: &DecisionMaker) -> Result<()>;
}

/// Sink that drops contacts; the [`RunReport`] still carries them.
pub struct NullSink;

impl ContactSink for NullSink {
    fn accept(&self, _contact: &DecisionMaker) -> Result<()> {
        Ok(())
    }
}

/// Progress callback for reporting run status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when a company reaches a terminal state.
    fn company_finished(&self, company: &str, state: CompanyState, finished: usize, total: usize);
    /// Called for every emitted contact.
    fn contact_found(&self, contact: &DecisionMaker);
    /// Called when the run completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn company_finished(&self, _company: &str, _state: CompanyState, _finished: usize, _total: usize) {}
    fn contact_found(&self, _contact: &DecisionMaker) {}
    fn done(&self, _report: &RunReport) {}
}

/// Terminal state of one company job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyState {
    NoWebsite,
    NoEmails,
    /// Every email branch reached its own terminal state.
    Processed,
}

/// Terminal state of one email branch.
#[derive(Debug, Clone, PartialEq)]
pub enum EmailState {
    SkippedGeneric,
    SkippedLowConfidence,
    NotFound,
    Rejected,
    Duplicate,
    Validated(Box<DecisionMaker>),
}

/// Terminal-state counts for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub companies: usize,
    pub no_website: usize,
    pub no_emails: usize,
    pub emails: usize,
    pub skipped_generic: usize,
    pub skipped_low_confidence: usize,
    pub no_person_match: usize,
    pub rejected_title: usize,
    pub duplicates: usize,
    pub accepted: usize,
    /// Branches degraded to not-found after a provider kept failing.
    pub provider_errors: usize,
    /// Companies still running at the deadline.
    pub abandoned: usize,
}

impl RunSummary {
    pub fn status(&self) -> RunStatus {
        if self.abandoned > 0 {
            RunStatus::PartialSuccess
        } else if self.accepted == 0 {
            RunStatus::NoResults
        } else if self.no_website + self.no_emails + self.provider_errors > 0 {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Complete
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every company was processed without degradation.
    Complete,
    /// Contacts were produced but some companies were not fully processed.
    PartialSuccess,
    /// No contacts were produced.
    NoResults,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::PartialSuccess => "partial_success",
            Self::NoResults => "no_results",
        }
    }
}

/// Outcome of [`Pipeline::run`].
#[derive(Debug, Clone)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,
    pub summary: RunSummary,
    pub contacts: Vec<DecisionMaker>,
    pub elapsed: Duration,
    pub timed_out: bool,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// A configured pipeline. Each [`run`](Self::run) gets fresh in-run state:
/// rate limiter, dedup set and caches.
pub struct Pipeline {
    config: PipelineConfig,
    search: Arc<dyn SearchProvider>,
    finder: Arc<dyn EmailFinder>,
    storage: Option<Arc<Storage>>,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        search: Arc<dyn SearchProvider>,
        finder: Arc<dyn EmailFinder>,
    ) -> Self {
        Self {
            config,
            search,
            finder,
            storage: None,
        }
    }

    /// Persist caches and run history to `storage`.
    pub fn with_storage(mut self, storage: Arc<Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Process every company and stream validated contacts to `sink`.
    ///
    /// Per-branch failures never fail the run; the report carries the
    /// terminal-state counts instead.
    #[instrument(skip_all, fields(companies = companies.len()))]
    pub async fn run(
        &self,
        companies: Vec<CompanyRecord>,
        sink: &dyn ContactSink,
        progress: &dyn ProgressReporter,
    ) -> Result<RunReport> {
        let start = Instant::now();
        let run_id = RunId::new();
        let total = companies.len();
        let ctx = Arc::new(self.context());

        info!(
            %run_id,
            company_concurrency = self.config.company_concurrency,
            email_concurrency = self.config.email_concurrency,
            min_confidence = ctx.min_confidence,
            "starting run"
        );

        if let Some(storage) = &self.storage {
            if let Err(e) = storage.insert_run(&run_id).await {
                warn!(error = %e, "failed to record run start");
            }
        }

        progress.phase("Discovering decision-makers");

        let (tx, mut rx) = mpsc::unbounded_channel();
        let slots = Arc::new(Semaphore::new(self.config.company_concurrency.max(1)));
        let mut workers = JoinSet::new();

        for company in companies {
            let ctx = ctx.clone();
            let tx = tx.clone();
            let slots = slots.clone();
            workers.spawn(async move {
                let Ok(_permit) = slots.acquire_owned().await else {
                    return;
                };
                let company = Arc::new(company);
                let state = process_company(&ctx, &company, &tx).await;
                let _ = tx.send(Event::Company {
                    name: company.name.clone(),
                    state,
                });
            });
        }
        drop(tx);

        let deadline = self.config.run_timeout.map(|t| start + t);
        let mut aggregator = Aggregator::new(run_id.clone(), total, self.storage.clone());
        let mut timed_out = false;

        loop {
            let event = match deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, rx.recv()).await {
                    Ok(event) => event,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                },
                None => rx.recv().await,
            };
            match event {
                Some(event) => aggregator.handle(event, sink, progress).await,
                None => break,
            }
        }

        if timed_out {
            warn!(
                finished = aggregator.finished,
                total, "run deadline passed, abandoning remaining companies"
            );
            workers.detach_all();
        } else {
            while let Some(joined) = workers.join_next().await {
                if let Err(e) = joined {
                    warn!(error = %e, "company worker failed");
                }
            }
        }

        let report = aggregator.finish(start.elapsed(), timed_out).await;
        progress.done(&report);

        info!(
            run_id = %report.run_id,
            status = report.status.as_str(),
            accepted = report.summary.accepted,
            no_website = report.summary.no_website,
            no_emails = report.summary.no_emails,
            no_person_match = report.summary.no_person_match,
            rejected_title = report.summary.rejected_title,
            abandoned = report.summary.abandoned,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "run completed"
        );

        Ok(report)
    }

    fn context(&self) -> RunContext {
        let limiter = Arc::new(RateLimiter::new(self.config.min_call_interval));
        let retry = RetryPolicy::from(&self.config);
        let ttl = self.config.cache_ttl_days;

        let mut websites = WebsiteResolver::new(
            self.search.clone(),
            limiter.clone(),
            retry.clone(),
            self.config.website_results,
        );
        let mut emails = CompanyEmailFinder::new(
            self.finder.clone(),
            limiter.clone(),
            retry.clone(),
            self.config.max_emails_per_domain,
        );
        if let Some(storage) = &self.storage {
            websites = websites.with_storage(storage.clone(), ttl);
            emails = emails.with_storage(storage.clone(), ttl);
        }

        RunContext {
            email_concurrency: self.config.email_concurrency.max(1),
            min_confidence: self.config.min_person_confidence.max(MIN_PERSON_CONFIDENCE),
            websites,
            emails,
            people: PersonResolver::new(self.search.clone(), limiter, retry),
            validator: TitleValidator::new(&self.config.extra_include, &self.config.extra_exclude),
            industries: IndustryClassifier::default(),
            dedup: DedupSet::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

/// In-run state shared by every worker.
struct RunContext {
    email_concurrency: usize,
    min_confidence: f32,
    websites: WebsiteResolver,
    emails: CompanyEmailFinder,
    people: PersonResolver,
    validator: TitleValidator,
    industries: IndustryClassifier,
    dedup: DedupSet,
}

enum Event {
    Company { name: String, state: CompanyState },
    Email(EmailState),
    ProviderError,
}

type Events = mpsc::UnboundedSender<Event>;

async fn process_company(
    ctx: &Arc<RunContext>,
    company: &Arc<CompanyRecord>,
    tx: &Events,
) -> CompanyState {
    let website = match ctx.websites.resolve(company).await {
        Ok(Some(site)) => site,
        Ok(None) => {
            info!(company = %company.name, stage = "website", "no website");
            return CompanyState::NoWebsite;
        }
        Err(e) => {
            warn!(company = %company.name, stage = "website", error = %e, "website resolution degraded");
            let _ = tx.send(Event::ProviderError);
            return CompanyState::NoWebsite;
        }
    };
    debug!(company = %company.name, domain = %website.domain, is_homepage = website.is_homepage, "website resolved");

    let lookup = match ctx.emails.find(&website.domain).await {
        Ok(lookup) if !lookup.emails.is_empty() => lookup,
        Ok(_) => {
            info!(company = %company.name, domain = %website.domain, stage = "emails", "no emails");
            return CompanyState::NoEmails;
        }
        Err(e) => {
            warn!(company = %company.name, domain = %website.domain, stage = "emails", error = %e, "email lookup degraded");
            let _ = tx.send(Event::ProviderError);
            return CompanyState::NoEmails;
        }
    };
    debug!(company = %company.name, count = lookup.emails.len(), "emails found");

    let industry: Option<Arc<str>> = ctx
        .industries
        .classify(&company.context_keywords())
        .map(Arc::from)
        .or_else(|| company.industry.as_deref().map(Arc::from));

    let slots = Arc::new(Semaphore::new(ctx.email_concurrency));
    let mut branches = JoinSet::new();
    for candidate in candidates(&lookup) {
        let ctx = ctx.clone();
        let company = company.clone();
        let industry = industry.clone();
        let tx = tx.clone();
        let slots = slots.clone();
        branches.spawn(async move {
            let Ok(_permit) = slots.acquire_owned().await else {
                return;
            };
            let state = process_email(&ctx, &company, industry.as_deref(), &candidate, &tx).await;
            let _ = tx.send(Event::Email(state));
        });
    }
    while let Some(joined) = branches.join_next().await {
        if let Err(e) = joined {
            warn!(company = %company.name, error = %e, "email worker failed");
        }
    }

    CompanyState::Processed
}

async fn process_email(
    ctx: &RunContext,
    company: &CompanyRecord,
    industry: Option<&str>,
    candidate: &EmailCandidate,
    tx: &Events,
) -> EmailState {
    let email = candidate.address.as_str();
    let contact = extract_contact(email);
    if contact.is_generic {
        debug!(%email, "generic mailbox skipped");
        return EmailState::SkippedGeneric;
    }
    if contact.confidence < ctx.min_confidence {
        debug!(%email, confidence = contact.confidence, "low-confidence name skipped");
        return EmailState::SkippedLowConfidence;
    }

    let profile = match ctx.people.resolve(&contact.candidate_name, &company.name).await {
        Ok(Some(profile)) => profile,
        Ok(None) => return EmailState::NotFound,
        Err(e) => {
            warn!(company = %company.name, %email, stage = "person", error = %e, "person resolution degraded");
            let _ = tx.send(Event::ProviderError);
            return EmailState::NotFound;
        }
    };

    match ctx.validator.validate(&profile.title, company.role_context.as_deref()) {
        Verdict::Accepted { keyword } => {
            debug!(%email, title = %profile.title, %keyword, "title accepted");
        }
        Verdict::Rejected(reason) => {
            debug!(%email, title = %profile.title, ?reason, "title rejected");
            return EmailState::Rejected;
        }
    }

    if !ctx.dedup.insert(&profile.full_name, &company.name).await {
        debug!(%email, name = %profile.full_name, "duplicate contact");
        return EmailState::Duplicate;
    }

    EmailState::Validated(Box::new(DecisionMaker {
        company_name: company.name.clone(),
        full_name: profile.full_name,
        title: profile.title,
        email: candidate.address.clone(),
        profile_url: profile.profile_url,
        domain: candidate.source_domain.clone(),
        industry: industry.map(str::to_string),
        confidence: contact.confidence,
        found_at: Utc::now(),
    }))
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

struct Aggregator {
    run_id: RunId,
    total: usize,
    finished: usize,
    summary: RunSummary,
    contacts: Vec<DecisionMaker>,
    storage: Option<Arc<Storage>>,
}

impl Aggregator {
    fn new(run_id: RunId, total: usize, storage: Option<Arc<Storage>>) -> Self {
        Self {
            run_id,
            total,
            finished: 0,
            summary: RunSummary {
                companies: total,
                ..RunSummary::default()
            },
            contacts: Vec::new(),
            storage,
        }
    }

    async fn handle(&mut self, event: Event, sink: &dyn ContactSink, progress: &dyn ProgressReporter) {
        match event {
            Event::Company { name, state } => {
                self.finished += 1;
                match state {
                    CompanyState::NoWebsite => self.summary.no_website += 1,
                    CompanyState::NoEmails => self.summary.no_emails += 1,
                    CompanyState::Processed => {}
                }
                progress.company_finished(&name, state, self.finished, self.total);
            }
            Event::Email(state) => {
                self.summary.emails += 1;
                match state {
                    EmailState::SkippedGeneric => self.summary.skipped_generic += 1,
                    EmailState::SkippedLowConfidence => self.summary.skipped_low_confidence += 1,
                    EmailState::NotFound => self.summary.no_person_match += 1,
                    EmailState::Rejected => self.summary.rejected_title += 1,
                    EmailState::Duplicate => self.summary.duplicates += 1,
                    EmailState::Validated(contact) => self.emit(*contact, sink, progress).await,
                }
            }
            Event::ProviderError => self.summary.provider_errors += 1,
        }
    }

    async fn emit(&mut self, contact: DecisionMaker, sink: &dyn ContactSink, progress: &dyn ProgressReporter) {
        self.summary.accepted += 1;
        info!(
            company = %contact.company_name,
            name = %contact.full_name,
            title = %contact.title,
            "decision-maker found"
        );
        if let Err(e) = sink.accept(&contact) {
            warn!(error = %e, "contact sink rejected contact");
        }
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.insert_contact(&self.run_id, &contact).await {
                warn!(error = %e, "failed to record contact");
            }
        }
        progress.contact_found(&contact);
        self.contacts.push(contact);
    }

    async fn finish(mut self, elapsed: Duration, timed_out: bool) -> RunReport {
        self.summary.abandoned = self.total.saturating_sub(self.finished);
        let status = self.summary.status();

        if let Some(storage) = &self.storage {
            let stats = serde_json::to_string(&self.summary).unwrap_or_default();
            if let Err(e) = storage.finish_run(&self.run_id, status.as_str(), &stats).await {
                warn!(error = %e, "failed to record run completion");
            }
        }

        RunReport {
            run_id: self.run_id,
            status,
            summary: self.summary,
            contacts: self.contacts,
            elapsed,
            timed_out,
        }
    }
}
