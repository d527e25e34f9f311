// src/sandbox/rhai_executor.rs — Rhai-backed executor
//
// Every execution gets a fresh engine and a fresh scope holding only the
// configured bindings. Rhai has no filesystem, network, environment or
// process access; the host API adds none and module imports resolve to
// nothing.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rhai::module_resolvers::DummyModuleResolver;
use rhai::{Dynamic, Engine, EvalAltResult, Scope};

use super::api::{self, DisplayHandle, Frame, PlotHandle};
use super::output::Output;
use super::{Bindings, Executor};
use crate::infra::config::ExecutionConfig;
use crate::infra::errors::DataScribeError;
use crate::pipeline::sanitize::SanitizedCode;
use crate::util::log_line;
use crate::viz::Figure;

pub struct RhaiExecutor {
    limits: ExecutionConfig,
}

impl RhaiExecutor {
    pub fn from_config(config: &ExecutionConfig) -> Self {
        Self {
            limits: config.clone(),
        }
    }
}

impl Default for RhaiExecutor {
    fn default() -> Self {
        Self::from_config(&ExecutionConfig::default())
    }
}

impl Executor for RhaiExecutor {
    fn execute(&self, code: &SanitizedCode, bindings: Bindings) -> Result<(), DataScribeError> {
        let timeout = Duration::from_secs(self.limits.timeout_seconds);
        let mut engine = create_sandbox_engine(&self.limits);

        let started = Instant::now();
        engine.on_progress(move |_ops| {
            if started.elapsed() > timeout {
                Some(Dynamic::UNIT)
            } else {
                None
            }
        });

        let renderer = bindings.renderer.clone();
        engine.on_print(move |text| renderer.render(Output::Text(text.to_string())));
        engine.on_debug(|text, _source, pos| {
            tracing::debug!(target: "generated_code", "{pos:?}: {text}");
        });

        let figure = Arc::new(Mutex::new(Figure::default()));
        let names = &bindings.names;
        let mut scope = Scope::new();
        scope.push(names.dataset.as_str(), Frame::new(bindings.dataset.clone()));
        scope.push(
            names.display.as_str(),
            DisplayHandle::new(bindings.renderer.clone(), figure.clone()),
        );
        scope.push(names.plot.as_str(), PlotHandle::new(figure));

        tracing::debug!(
            "Executing generated code: {}",
            log_line(code.as_str(), 200)
        );

        let ast = engine
            .compile_with_scope(&scope, code.as_str())
            .map_err(|e| DataScribeError::Execution(e.to_string()))?;

        engine
            .run_ast_with_scope(&mut scope, &ast)
            .map_err(|e| match *e {
                EvalAltResult::ErrorTerminated(..) => DataScribeError::ExecutionTimeout {
                    seconds: self.limits.timeout_seconds,
                },
                other => DataScribeError::Execution(other.to_string()),
            })?;

        tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "Generated code finished");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Engine factory
// ---------------------------------------------------------------------------

/// A Rhai engine with resource limits and the host API registered.
/// `eval` is disabled and every variable must be bound or declared.
pub fn create_sandbox_engine(limits: &ExecutionConfig) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_expr_depths(64, 32);
    engine.set_max_call_levels(32);
    engine.set_max_operations(limits.max_operations);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);

    engine.disable_symbol("eval");
    engine.set_strict_variables(true);
    // the default resolver loads `.rhai` files from disk
    engine.set_module_resolver(DummyModuleResolver::new());

    engine.register_fn("log", |msg: &str| {
        tracing::info!(target: "generated_code", "{}", msg);
    });

    api::register_api(&mut engine);
    engine
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::loader::load_csv_reader;
    use crate::infra::config::Config;
    use crate::pipeline::sanitize::Sanitizer;
    use crate::sandbox::output::{NoticeLevel, RecordingRenderer};
    use pretty_assertions::assert_eq;

    fn run(
        executor: &RhaiExecutor,
        code: &str,
    ) -> (Result<(), DataScribeError>, Vec<Output>) {
        let config = Config::default();
        let csv = "date,sales\n2023-01-01,100\n2023-01-02,150\n2023-01-03,200\n";
        let dataset = Arc::new(load_csv_reader(csv.as_bytes()).unwrap());
        let renderer = Arc::new(RecordingRenderer::new());
        let code = Sanitizer::from_config(&config)
            .unwrap()
            .sanitize(code)
            .unwrap();
        let bindings = Bindings::new(config.bindings.clone(), dataset, renderer.clone());
        let result = executor.execute(&code, bindings);
        (result, renderer.outputs())
    }

    #[test]
    fn test_total_sales_metric() {
        let (result, outputs) = run(
            &RhaiExecutor::default(),
            r#"let total = data.sum("sales"); st.metric("Total Sales", total);"#,
        );
        result.unwrap();
        assert_eq!(
            outputs,
            vec![Output::Metric {
                label: "Total Sales".into(),
                value: "450".into()
            }]
        );
    }

    #[test]
    fn test_print_goes_to_renderer() {
        let (result, outputs) = run(&RhaiExecutor::default(), r#"print(`rows: ${data.len()}`);"#);
        result.unwrap();
        assert_eq!(outputs, vec![Output::Text("rows: 3".into())]);
    }

    #[test]
    fn test_unknown_variable_is_compile_error() {
        let (result, outputs) = run(&RhaiExecutor::default(), "st.write(revenue);");
        let err = result.unwrap_err();
        assert!(matches!(err, DataScribeError::Execution(_)));
        assert!(err.to_string().contains("revenue"));
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_runtime_error_keeps_earlier_outputs() {
        let (result, outputs) = run(
            &RhaiExecutor::default(),
            r#"st.info("starting"); st.metric("x", data.sum("revenue"));"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Unknown column 'revenue'"));
        assert_eq!(
            outputs,
            vec![Output::Notice {
                level: NoticeLevel::Info,
                message: "starting".into()
            }]
        );
    }

    #[test]
    fn test_operation_limit() {
        let executor = RhaiExecutor::from_config(&ExecutionConfig {
            max_operations: 1_000,
            ..ExecutionConfig::default()
        });
        let (result, _) = run(&executor, "let x = 0; loop { x += 1; }");
        assert!(matches!(result, Err(DataScribeError::Execution(_))));
    }

    #[test]
    fn test_wall_clock_timeout() {
        let executor = RhaiExecutor::from_config(&ExecutionConfig {
            timeout_seconds: 1,
            max_operations: 0,
            ..ExecutionConfig::default()
        });
        let (result, _) = run(&executor, "let x = 0; loop { x += 1; }");
        match result {
            Err(DataScribeError::ExecutionTimeout { seconds }) => assert_eq!(seconds, 1),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_import_cannot_read_files() {
        let dir = tempfile::tempdir().unwrap();
        let module = dir.path().join("secret.rhai");
        std::fs::write(&module, r#"export const SECRET = "file contents";"#).unwrap();
        let stem = module.with_extension("");

        let code = format!(
            r#"import "{}" as m; st.write(m::SECRET);"#,
            stem.display()
        );
        let (result, outputs) = run(&RhaiExecutor::default(), &code);
        assert!(matches!(result, Err(DataScribeError::Execution(_))));
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_bindings_are_the_only_globals() {
        let (result, _) = run(&RhaiExecutor::default(), "let f = uploaded; st.write(f);");
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_binding_names() {
        let mut config = Config::default();
        config.bindings.dataset = "df".into();
        let csv = "a\n1\n2\n";
        let dataset = Arc::new(load_csv_reader(csv.as_bytes()).unwrap());
        let renderer = Arc::new(RecordingRenderer::new());
        let code = Sanitizer::from_config(&config)
            .unwrap()
            .sanitize(r#"st.metric("n", df.len());"#)
            .unwrap();
        let bindings = Bindings::new(config.bindings.clone(), dataset, renderer.clone());
        RhaiExecutor::default().execute(&code, bindings).unwrap();
        assert_eq!(
            renderer.outputs(),
            vec![Output::Metric {
                label: "n".into(),
                value: "2".into()
            }]
        );
    }
}
