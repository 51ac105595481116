use std::sync::Arc;

use crate::Result;
use crate::config::DectestConfig;
use crate::error::DectestError;
use crate::http::{HttpTransport, Transport};
use crate::registry::{self, MetadataRegistry};
use crate::runner::types::SuiteReport;
use crate::suite::{OrchestratorSettings, RunFilter, Suite, SuiteOrchestrator, SuiteRun};

/// 按注册顺序执行多个套件
pub struct SuiteRunner<'r> {
    registry: &'r MetadataRegistry,
    settings: OrchestratorSettings,
    transport: Arc<dyn Transport>,
    filter: RunFilter,
    suites: Vec<Box<dyn SuiteRun + 'r>>,
}

impl<'r> SuiteRunner<'r> {
    pub fn new(registry: &'r MetadataRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            settings: OrchestratorSettings::default(),
            transport,
            filter: RunFilter::default(),
            suites: Vec::new(),
        }
    }

    /// 使用进程级注册表
    pub fn global(transport: Arc<dyn Transport>) -> SuiteRunner<'static> {
        SuiteRunner::new(registry::global(), transport)
    }

    /// 用配置文件构建 HTTP 传输层和编排设置
    pub fn from_config(registry: &'r MetadataRegistry, config: &DectestConfig) -> Result<Self> {
        let transport = HttpTransport::from_config(config).map_err(|e| {
            DectestError::transport(config.base_url.clone().unwrap_or_default(), e)
        })?;
        Ok(Self::new(registry, Arc::new(transport)).with_settings(OrchestratorSettings::from(config)))
    }

    pub fn with_settings(mut self, settings: OrchestratorSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_filter(mut self, filter: RunFilter) -> Self {
        self.filter = filter;
        self
    }

    /// 收集一个套件的声明
    pub fn add_suite<S: Suite>(&mut self) -> &mut Self {
        let orchestrator = SuiteOrchestrator::<S>::collect_with(self.registry, self.settings);
        self.suites.push(Box::new(orchestrator));
        self
    }

    pub fn suite_count(&self) -> usize {
        self.suites.len()
    }

    /// 解析并执行全部套件
    ///
    /// 只要任一套件里有 only 测试，其它所有没有 only 标记的测试都会被跳过。
    pub async fn run(&mut self) -> Vec<SuiteReport> {
        let only = match self.filter.only {
            Some(only) => only,
            None => self
                .suites
                .iter_mut()
                .any(|suite| suite.resolve_plan().has_only()),
        };
        let filter = RunFilter {
            only: Some(only),
            ..self.filter.clone()
        };

        tracing::info!(suites = self.suites.len(), only, "starting run");

        let mut reports = Vec::with_capacity(self.suites.len());
        for suite in self.suites.iter_mut() {
            let report = suite.run_boxed(self.transport.clone(), &filter).await;
            reports.push(report);
        }
        reports
    }
}
