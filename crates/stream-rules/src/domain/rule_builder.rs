//! # Rule Pipelines
//!
//! Every payload rule is assembled as an ordered pipeline and reduced by a
//! single terminal `run()`:
//!
//! ```text
//! fail? ──→ checks (in order) ──→ chain auth ──→ receipt ──→ side effects
//!   │            │  false → NoOp
//!   └── Err      └─ Err   → Err
//! ```
//!
//! Steps are boxed closures borrowing the per-call context, so nothing runs
//! until `run()`, and nothing after a short-circuit runs at all.
//! Producers returning `None` contribute nothing to the verdict.

use shared_types::{EvmReceipt, ProtocolError, ProtocolResult, StreamId};
use tracing::trace;

use super::chain_auth::{ChainAuthArgs, ChainAuthRequirement};
use super::verdict::{
    AddEventOutcome, AddEventSideEffects, AddEventVerifications, CreateStreamRules, DerivedEvent,
};

pub(crate) type Check<'a> = Box<dyn FnOnce() -> ProtocolResult<bool> + 'a>;
pub(crate) type ChainAuthProducer<'a> =
    Box<dyn FnOnce() -> ProtocolResult<Option<ChainAuthArgs>> + 'a>;
pub(crate) type DerivedEventProducer<'a> =
    Box<dyn FnOnce() -> ProtocolResult<Option<DerivedEvent>> + 'a>;
type ReceiptProducer<'a> = Box<dyn FnOnce() -> ProtocolResult<Option<EvmReceipt>> + 'a>;

enum Step<'a> {
    Check(Check<'a>),
    OneOf(Vec<Check<'a>>),
}

#[derive(Clone, Copy)]
enum AuthMode {
    All,
    OneOf,
}

// =============================================================================
// ADD EVENT
// =============================================================================

/// Pipeline for a single candidate event.
#[must_use]
pub(crate) struct AddEventRules<'a> {
    failure: Option<ProtocolError>,
    steps: Vec<Step<'a>>,
    chain_auth: Option<(AuthMode, Vec<ChainAuthProducer<'a>>)>,
    receipt: Option<ReceiptProducer<'a>>,
    parent_event: Option<DerivedEventProducer<'a>>,
    on_chain_auth_failure: Option<DerivedEventProducer<'a>>,
}

impl<'a> AddEventRules<'a> {
    pub(crate) fn new() -> Self {
        Self {
            failure: None,
            steps: Vec::new(),
            chain_auth: None,
            receipt: None,
            parent_event: None,
            on_chain_auth_failure: None,
        }
    }

    /// A pipeline that rejects unconditionally.
    pub(crate) fn fail(err: ProtocolError) -> Self {
        let mut rules = Self::new();
        rules.failure = Some(err);
        rules
    }

    /// `Ok(false)` short-circuits to a no-op, `Err` to a rejection.
    pub(crate) fn check(mut self, check: impl FnOnce() -> ProtocolResult<bool> + 'a) -> Self {
        self.steps.push(Step::Check(Box::new(check)));
        self
    }

    /// Passes when any alternative passes. Otherwise surfaces the last
    /// error, or a no-op when no alternative errored.
    pub(crate) fn check_one_of(mut self, checks: Vec<Check<'a>>) -> Self {
        self.steps.push(Step::OneOf(checks));
        self
    }

    /// Adds a query to the all-of chain auth group.
    pub(crate) fn require_chain_auth(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Option<ChainAuthArgs>> + 'a,
    ) -> Self {
        match &mut self.chain_auth {
            Some((AuthMode::All, producers)) => producers.push(Box::new(producer)),
            _ => self.chain_auth = Some((AuthMode::All, vec![Box::new(producer)])),
        }
        self
    }

    /// Replaces the chain auth group with a one-of group.
    pub(crate) fn require_one_of_chain_auths(mut self, producers: Vec<ChainAuthProducer<'a>>) -> Self {
        self.chain_auth = Some((AuthMode::OneOf, producers));
        self
    }

    pub(crate) fn verify_receipt(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Option<EvmReceipt>> + 'a,
    ) -> Self {
        self.receipt = Some(Box::new(producer));
        self
    }

    pub(crate) fn require_parent_event(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Option<DerivedEvent>> + 'a,
    ) -> Self {
        self.parent_event = Some(Box::new(producer));
        self
    }

    pub(crate) fn on_chain_auth_failure(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Option<DerivedEvent>> + 'a,
    ) -> Self {
        self.on_chain_auth_failure = Some(Box::new(producer));
        self
    }

    pub(crate) fn run(self) -> ProtocolResult<AddEventOutcome> {
        if let Some(err) = self.failure {
            return Err(err);
        }

        for (index, step) in self.steps.into_iter().enumerate() {
            match step {
                Step::Check(check) => {
                    if !check()? {
                        trace!(step = index, "check returned false, no-op");
                        return Ok(AddEventOutcome::NoOp);
                    }
                }
                Step::OneOf(checks) => {
                    let mut last_err = None;
                    let mut passed = false;
                    for check in checks {
                        match check() {
                            Ok(true) => {
                                passed = true;
                                break;
                            }
                            Ok(false) => {}
                            Err(err) => last_err = Some(err),
                        }
                    }
                    if !passed {
                        trace!(step = index, errored = last_err.is_some(), "no alternative passed");
                        return match last_err {
                            Some(err) => Err(err),
                            None => Ok(AddEventOutcome::NoOp),
                        };
                    }
                }
            }
        }

        let mut verifications = AddEventVerifications::default();
        if let Some((mode, producers)) = self.chain_auth {
            let mut args = Vec::with_capacity(producers.len());
            for producer in producers {
                if let Some(arg) = producer()? {
                    args.push(arg);
                }
            }
            if !args.is_empty() {
                verifications.chain_auth = Some(match mode {
                    AuthMode::All => ChainAuthRequirement::All(args),
                    AuthMode::OneOf => ChainAuthRequirement::OneOf(args),
                });
            }
        }
        if let Some(producer) = self.receipt {
            verifications.receipt = producer()?;
        }

        let mut side_effects = AddEventSideEffects::default();
        if let Some(producer) = self.parent_event {
            side_effects.required_parent_event = producer()?;
        }
        if let Some(producer) = self.on_chain_auth_failure {
            side_effects.on_chain_auth_failure = producer()?;
        }

        Ok(AddEventOutcome::admissible(verifications, side_effects))
    }
}

// =============================================================================
// CREATE STREAM
// =============================================================================

type Requirement<'a> = Box<dyn FnOnce() -> ProtocolResult<()> + 'a>;
type DerivedEventsProducer<'a> = Box<dyn FnOnce() -> ProtocolResult<Vec<DerivedEvent>> + 'a>;
type StreamIdsProducer<'a> = Box<dyn FnOnce() -> ProtocolResult<Vec<StreamId>> + 'a>;

/// Pipeline for a stream inception bundle. Creation has no no-op outcome:
/// every requirement either holds or rejects.
#[must_use]
pub(crate) struct CreateStreamRuleSet<'a> {
    failure: Option<ProtocolError>,
    requirements: Vec<Requirement<'a>>,
    chain_auth: Option<ChainAuthProducer<'a>>,
    derived_events: Vec<DerivedEventsProducer<'a>>,
    required_memberships: Option<StreamIdsProducer<'a>>,
    required_user_streams: Option<StreamIdsProducer<'a>>,
}

impl<'a> CreateStreamRuleSet<'a> {
    pub(crate) fn new() -> Self {
        Self {
            failure: None,
            requirements: Vec::new(),
            chain_auth: None,
            derived_events: Vec::new(),
            required_memberships: None,
            required_user_streams: None,
        }
    }

    pub(crate) fn fail(err: ProtocolError) -> Self {
        let mut rules = Self::new();
        rules.failure = Some(err);
        rules
    }

    pub(crate) fn check(mut self, requirement: impl FnOnce() -> ProtocolResult<()> + 'a) -> Self {
        self.requirements.push(Box::new(requirement));
        self
    }

    pub(crate) fn require_chain_auth(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Option<ChainAuthArgs>> + 'a,
    ) -> Self {
        self.chain_auth = Some(Box::new(producer));
        self
    }

    pub(crate) fn require_derived_event(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Option<DerivedEvent>> + 'a,
    ) -> Self {
        self.derived_events
            .push(Box::new(move || Ok(producer()?.into_iter().collect())));
        self
    }

    pub(crate) fn require_derived_events(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Vec<DerivedEvent>> + 'a,
    ) -> Self {
        self.derived_events.push(Box::new(producer));
        self
    }

    pub(crate) fn require_memberships(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Vec<StreamId>> + 'a,
    ) -> Self {
        self.required_memberships = Some(Box::new(producer));
        self
    }

    pub(crate) fn require_user_streams(
        mut self,
        producer: impl FnOnce() -> ProtocolResult<Vec<StreamId>> + 'a,
    ) -> Self {
        self.required_user_streams = Some(Box::new(producer));
        self
    }

    pub(crate) fn run(self) -> ProtocolResult<CreateStreamRules> {
        if let Some(err) = self.failure {
            return Err(err);
        }
        for requirement in self.requirements {
            requirement()?;
        }

        let mut rules = CreateStreamRules::default();
        if let Some(producer) = self.chain_auth {
            rules.chain_auth = producer()?;
        }
        for producer in self.derived_events {
            rules.derived_events.extend(producer()?);
        }
        if let Some(producer) = self.required_memberships {
            rules.required_memberships = producer()?;
        }
        if let Some(producer) = self.required_user_streams {
            rules.required_user_streams = producer()?;
        }
        Ok(rules)
    }
}
