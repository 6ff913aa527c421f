//! Invocable operations and the start-up operation table

use std::{any::Any, collections::HashMap, fmt, marker::PhantomData, sync::Arc};

use async_trait::async_trait;

use crate::{
    formatter::{DispatchFormatter, FormatterConfig},
    protocol::{
        descriptor::OperationDescriptor,
        error::{DispatchError, DispatchResult},
        types::{BoxedValue, ParameterSlots},
    },
};

/// A remotely invocable operation
///
/// Receives the parameter slots filled by the formatter, in index order, and
/// returns a value of the descriptor's return type.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Operation: Send + Sync {
    /// Invoke the operation
    async fn invoke(&self, parameters: &ParameterSlots) -> DispatchResult<BoxedValue>;
}

/// Adapt a synchronous closure into an [`Operation`]
pub fn operation_fn<F, T>(f: F) -> Arc<dyn Operation>
where
    F: Fn(&ParameterSlots) -> DispatchResult<T> + Send + Sync + 'static,
    T: Any + Send + Sync,
{
    Arc::new(FnOperation {
        f,
        _result: PhantomData,
    })
}

struct FnOperation<F, T> {
    f: F,
    _result: PhantomData<fn() -> T>,
}

#[async_trait]
impl<F, T> Operation for FnOperation<F, T>
where
    F: Fn(&ParameterSlots) -> DispatchResult<T> + Send + Sync + 'static,
    T: Any + Send + Sync,
{
    async fn invoke(&self, parameters: &ParameterSlots) -> DispatchResult<BoxedValue> {
        let value = (self.f)(parameters)?;
        Ok(Box::new(value))
    }
}

/// A registered operation with its formatter
pub struct OperationEntry {
    pub formatter: DispatchFormatter,
    pub operation: Arc<dyn Operation>,
}

impl fmt::Debug for OperationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationEntry")
            .field("formatter", &self.formatter)
            .finish_non_exhaustive()
    }
}

/// Operations of a service, keyed by name
///
/// Built once before traffic starts; every registered operation gets its own
/// formatter sharing the table's configuration.
#[derive(Debug, Clone, Default)]
pub struct OperationTable {
    config: FormatterConfig,
    entries: HashMap<String, Arc<OperationEntry>>,
}

impl OperationTable {
    /// Create an empty table with the default formatter configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table with a custom formatter configuration
    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
        }
    }

    /// Register `operation` under its descriptor's name
    pub fn register(
        mut self,
        descriptor: OperationDescriptor,
        operation: Arc<dyn Operation>,
    ) -> DispatchResult<Self> {
        let name = descriptor.name().to_string();
        if self.entries.contains_key(&name) {
            return Err(DispatchError::BindingConfiguration(format!(
                "Operation '{}' is registered twice",
                name
            )));
        }

        let formatter = DispatchFormatter::with_config(Arc::new(descriptor), self.config.clone());
        tracing::debug!(operation = %name, "registered operation");
        self.entries.insert(
            name,
            Arc::new(OperationEntry {
                formatter,
                operation,
            }),
        );
        Ok(self)
    }

    /// Look up an operation by name
    pub fn get(&self, name: &str) -> Option<Arc<OperationEntry>> {
        self.entries.get(name).cloned()
    }

    /// Names of the registered operations
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn config(&self) -> &FormatterConfig {
        &self.config
    }
}
