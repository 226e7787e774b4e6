//! Phase sequencing

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use clap::ValueEnum;
use cmdbsync_common::format_duration;
use cmdbsync_core::{
    CascadeReconciler, CascadeSyncStats, DomainReconciler, DomainSyncStats, OptionIdReconciler,
    OptionIdStats, PassReport, ServiceReconciler, ServiceSyncStats,
};
use cmdbsync_domain::{Result, SyncError};
use tracing::{info, warn};

use crate::context::AppContext;

/// One reconciliation pass, in run order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, ValueEnum)]
pub enum Phase {
    /// Domain name backfill and documentation table maintenance
    Domains,
    /// Cascading option tree
    Cascade,
    /// Service items
    Services,
    /// Option id backfill
    OptionIds,
}

impl Phase {
    pub const ALL: [Self; 4] = [Self::Domains, Self::Cascade, Self::Services, Self::OptionIds];

    /// Phases to run for an optional `--phase` selection.
    pub fn selection(only: Option<Self>) -> Vec<Self> {
        only.map_or_else(|| Self::ALL.to_vec(), |phase| vec![phase])
    }

    const fn title(self) -> &'static str {
        match self {
            Self::Domains => "Business domain backfill",
            Self::Cascade => "Cascading option sync",
            Self::Services => "Business service sync",
            Self::OptionIds => "Option id backfill",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Domains => "domains",
            Self::Cascade => "cascade",
            Self::Services => "services",
            Self::OptionIds => "option-ids",
        })
    }
}

/// Run the selected phases in order. The first failing phase stops the run.
///
/// In a full run the domain phase is skipped when no documentation page is
/// configured; selecting it explicitly makes that a configuration error.
pub async fn run(ctx: &AppContext, phases: &[Phase]) -> Result<()> {
    let explicit = phases.len() == 1;
    for &phase in phases {
        if phase == Phase::Domains && ctx.mapping.is_none() && !explicit {
            warn!(phase = %phase, "no confluence section configured; phase skipped");
            continue;
        }
        run_phase(ctx, phase).await?;
    }
    Ok(())
}

async fn run_phase(ctx: &AppContext, phase: Phase) -> Result<()> {
    info!("========== {} ==========", phase.title());
    let started = Instant::now();

    let summary = match phase {
        Phase::Domains => summarize(run_domains(ctx).await?),
        Phase::Cascade => summarize(run_cascade(ctx).await?),
        Phase::Services => summarize(run_services(ctx).await?),
        Phase::OptionIds => summarize(run_option_ids(ctx).await?),
    };

    info!(
        phase = %phase,
        failed = summary.failed,
        duration = %format_duration(started.elapsed()),
        "{} finished: {}",
        phase.title(),
        summary.stats
    );
    Ok(())
}

struct Summary {
    stats: String,
    failed: usize,
}

fn summarize<S: fmt::Display>(report: PassReport<S>) -> Summary {
    let failed = report.failed_outcomes().count();
    Summary { stats: report.stats.to_string(), failed }
}

async fn run_domains(ctx: &AppContext) -> Result<PassReport<DomainSyncStats>> {
    let mapping = ctx
        .mapping
        .clone()
        .ok_or_else(|| SyncError::Config("confluence section is not configured".into()))?;
    let domains = ctx.exports.domains().await?;
    DomainReconciler::new(Arc::clone(&ctx.tracker), Arc::clone(&ctx.applier), mapping, ctx.settings())?
        .with_audit(ctx.audit.clone())
        .run(domains, false)
        .await
}

async fn run_cascade(ctx: &AppContext) -> Result<PassReport<CascadeSyncStats>> {
    let services = ctx.exports.services().await?;
    let domains = ctx.exports.domains().await?;
    CascadeReconciler::new(Arc::clone(&ctx.options), Arc::clone(&ctx.applier))
        .with_report(Arc::clone(&ctx.report))
        .with_audit(ctx.audit.clone())
        .run(services, domains)
        .await
}

async fn run_services(ctx: &AppContext) -> Result<PassReport<ServiceSyncStats>> {
    let services = ctx.exports.services().await?;
    ServiceReconciler::new(
        Arc::clone(&ctx.tracker),
        Arc::clone(&ctx.applier),
        Arc::clone(&ctx.reporter),
        ctx.settings(),
    )?
    .with_audit(ctx.audit.clone())
    .run(services)
    .await
}

async fn run_option_ids(ctx: &AppContext) -> Result<PassReport<OptionIdStats>> {
    OptionIdReconciler::new(
        Arc::clone(&ctx.tracker),
        Arc::clone(&ctx.options),
        Arc::clone(&ctx.applier),
        ctx.settings(),
    )?
    .run()
    .await
}
