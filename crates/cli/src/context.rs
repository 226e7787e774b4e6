//! Run context - adapter wiring for one process

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use cmdbsync_core::{
    ApplierSettings, AuditTrail, ChangeReportSink, DomainMappingSource, IssueTracker,
    OperationApplier, OptionStore, ReporterResolver,
};
use cmdbsync_domain::{AppConfig, ExportSnapshot, Result, SyncSettings};
use cmdbsync_infra::{
    load_export, ConfluenceClient, ConfluenceDomainTable, CsvChangeReport, HttpClient,
    JiraIssueTracker, JiraOptionStore, JsonlAuditLedger,
};
use tokio::sync::OnceCell;
use tracing::info;

/// Holds every adapter and shared service of a run
pub struct AppContext {
    pub config: AppConfig,
    pub tracker: Arc<dyn IssueTracker>,
    pub options: Arc<dyn OptionStore>,
    /// Present only when the documentation page is configured.
    pub mapping: Option<Arc<dyn DomainMappingSource>>,
    pub applier: Arc<OperationApplier>,
    pub reporter: Arc<ReporterResolver>,
    pub report: Arc<dyn ChangeReportSink>,
    pub audit: AuditTrail,
    pub exports: Exports,
}

impl AppContext {
    /// Build the adapters. Nothing is fetched yet; the only side effect is
    /// opening the audit ledger.
    pub async fn new(config: AppConfig) -> Result<Self> {
        let settings = &config.settings;
        let http = HttpClient::from_credentials(&config.credentials)?;

        let tracker: Arc<dyn IssueTracker> = Arc::new(JiraIssueTracker::new(http.clone()));
        let cascade = &settings.dropdown_cascading_field;
        let options: Arc<dyn OptionStore> = Arc::new(JiraOptionStore::new(
            http.clone(),
            &cascade.bus_domain_and_service,
            &cascade.context_id,
        ));

        let ttl = Duration::from_secs(settings.domain_cache_ttl_secs);
        let mapping = settings.confluence.as_ref().map(|confluence| {
            let table = ConfluenceDomainTable::new(ConfluenceClient::new(http.clone()), confluence, ttl);
            Arc::new(table) as Arc<dyn DomainMappingSource>
        });

        let ledger = JsonlAuditLedger::open(&settings.output.error_ledger).await?;
        info!(run_id = %ledger.run_id(), path = %ledger.path().display(), "audit ledger opened");
        let audit = AuditTrail::new(Arc::new(ledger));

        let mut applier = OperationApplier::new(
            Arc::clone(&tracker),
            Arc::clone(&options),
            config.mode,
            ApplierSettings::from(&settings.rate_limit),
        )
        .with_audit(audit.clone());
        if let Some(mapping) = &mapping {
            applier = applier.with_mapping_source(Arc::clone(mapping));
        }

        let reporter = Arc::new(ReporterResolver::new(
            Arc::clone(&tracker),
            settings.jira.reporter_account_id.clone(),
        ));
        let report: Arc<dyn ChangeReportSink> = Arc::new(CsvChangeReport::new(&settings.output.csv_report));
        let exports = Exports::new(settings);

        Ok(Self {
            config,
            tracker,
            options,
            mapping,
            applier: Arc::new(applier),
            reporter,
            report,
            audit,
            exports,
        })
    }

    pub const fn settings(&self) -> &SyncSettings {
        &self.config.settings
    }
}

/// Export files, read on first use and shared by the phases
pub struct Exports {
    services_file: PathBuf,
    domains_file: PathBuf,
    services: OnceCell<ExportSnapshot>,
    domains: OnceCell<ExportSnapshot>,
}

impl Exports {
    pub fn new(settings: &SyncSettings) -> Self {
        Self {
            services_file: settings.inputs.services_file.clone(),
            domains_file: settings.inputs.domains_file.clone(),
            services: OnceCell::new(),
            domains: OnceCell::new(),
        }
    }

    pub async fn services(&self) -> Result<&ExportSnapshot> {
        self.services.get_or_try_init(|| load_export(&self.services_file)).await
    }

    pub async fn domains(&self) -> Result<&ExportSnapshot> {
        self.domains.get_or_try_init(|| load_export(&self.domains_file)).await
    }
}
