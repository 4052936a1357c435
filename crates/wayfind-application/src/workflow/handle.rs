use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use wayfind_core::config::WorkflowConfig;
use wayfind_core::debounce::Debouncer;
use wayfind_core::error::{Result, WayfindError};
use wayfind_core::geometry::{Envelope, Point};
use wayfind_core::search::{FeatureSource, GeocodeClient};

use super::command::{Command, InputField, Message, SearchRequest};
use super::event::{DisplayEvent, WorkflowSnapshot};
use super::runner::WorkflowRunner;

/// Capacity of the display event channel; slow subscribers lag beyond this.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Builder for [`SearchWorkflow`].
pub struct WorkflowBuilder {
    client: Arc<dyn GeocodeClient>,
    features: Option<Arc<dyn FeatureSource>>,
    config: WorkflowConfig,
}

impl WorkflowBuilder {
    pub fn new(client: Arc<dyn GeocodeClient>) -> Self {
        Self {
            client,
            features: None,
            config: WorkflowConfig::default(),
        }
    }

    /// Table searched by [`SearchWorkflow::query_features`].
    pub fn feature_source(mut self, source: Arc<dyn FeatureSource>) -> Self {
        self.features = Some(source);
        self
    }

    pub fn config(mut self, config: WorkflowConfig) -> Self {
        self.config = config;
        self
    }

    /// Starts the update task on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn(self) -> SearchWorkflow {
        let (tx, rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let shutdown = CancellationToken::new();

        let delay = self.config.debounce();
        let search_debouncer = settle_into(&tx, InputField::Search, delay);
        let location_debouncer = settle_into(&tx, InputField::Location, delay);

        let runner = WorkflowRunner::new(
            self.client,
            self.features,
            self.config,
            tx.clone(),
            events.clone(),
            shutdown.clone(),
        );
        let task = tokio::spawn(runner.run(rx));

        SearchWorkflow {
            tx,
            events,
            search_debouncer,
            location_debouncer,
            shutdown,
            task: Some(task),
        }
    }
}

fn settle_into(
    tx: &mpsc::UnboundedSender<Message>,
    field: InputField,
    delay: std::time::Duration,
) -> Debouncer<String> {
    let tx = tx.clone();
    Debouncer::spawn(delay, move |text: String| {
        tracing::debug!("[Workflow] {:?} text settled: '{}'", field, text);
        let _ = tx.send(Message::Command(Command::TextSettled { field, text }));
    })
}

/// Handle to a running search-and-display workflow.
///
/// Every method enqueues onto the single update path and returns
/// immediately; results arrive as [`DisplayEvent`]s. Dropping the handle
/// stops the workflow and cancels anything in flight.
///
/// # Example
///
/// ```no_run
/// # use std::sync::Arc;
/// # use wayfind_application::{SearchRequest, SearchWorkflow};
/// # async fn demo(client: Arc<dyn wayfind_core::search::GeocodeClient>) -> wayfind_core::Result<()> {
/// let workflow = SearchWorkflow::builder(client).spawn();
/// let mut events = workflow.subscribe();
///
/// workflow.submit(SearchRequest::new("coffee").near("Redlands, CA"))?;
/// while let Ok(event) = events.recv().await {
///     println!("{:?}", event);
/// }
/// # Ok(())
/// # }
/// ```
pub struct SearchWorkflow {
    tx: mpsc::UnboundedSender<Message>,
    events: broadcast::Sender<DisplayEvent>,
    search_debouncer: Debouncer<String>,
    location_debouncer: Debouncer<String>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl SearchWorkflow {
    pub fn builder(client: Arc<dyn GeocodeClient>) -> WorkflowBuilder {
        WorkflowBuilder::new(client)
    }

    /// Starts a workflow; shorthand for [`WorkflowBuilder`].
    pub fn spawn(
        client: Arc<dyn GeocodeClient>,
        features: Option<Arc<dyn FeatureSource>>,
        config: WorkflowConfig,
    ) -> Self {
        let mut builder = WorkflowBuilder::new(client).config(config);
        builder.features = features;
        builder.spawn()
    }

    /// Subscribes to display events emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<DisplayEvent> {
        self.events.subscribe()
    }

    /// Records a keystroke in the search box.
    ///
    /// Suggestions are requested once typing has paused for the debounce
    /// period, for the last text only.
    pub fn search_text_changed(&self, text: impl Into<String>) -> Result<()> {
        self.text_changed(InputField::Search, text.into())
    }

    /// Records a keystroke in the location box.
    pub fn location_text_changed(&self, text: impl Into<String>) -> Result<()> {
        self.text_changed(InputField::Location, text.into())
    }

    fn text_changed(&self, field: InputField, text: String) -> Result<()> {
        self.send(Command::TextEdited {
            field,
            text: text.clone(),
        })?;
        self.debouncer(field).notify(text);
        Ok(())
    }

    fn debouncer(&self, field: InputField) -> &Debouncer<String> {
        match field {
            InputField::Search => &self.search_debouncer,
            InputField::Location => &self.location_debouncer,
        }
    }

    /// Starts a forward search, superseding any search in flight.
    pub fn submit(&self, request: SearchRequest) -> Result<()> {
        self.search_debouncer.cancel();
        self.location_debouncer.cancel();
        self.send(Command::Submit(request))
    }

    /// Starts a forward search with whatever the input boxes currently hold.
    pub fn submit_current(&self, restrict_to_extent: bool) -> Result<()> {
        self.search_debouncer.cancel();
        self.location_debouncer.cancel();
        self.send(Command::SubmitCurrent { restrict_to_extent })
    }

    /// Queries the feature table for features whose configured field
    /// contains `text` (case-insensitive) and selects every match.
    pub fn query_features(&self, text: impl Into<String>) -> Result<()> {
        self.send(Command::QueryFeatures { text: text.into() })
    }

    pub fn reverse_lookup(&self, point: Point) -> Result<()> {
        self.send(Command::ReverseLookup { point })
    }

    /// Adds a live result to the selection.
    pub fn select(&self, result_id: impl Into<String>) -> Result<()> {
        self.send(Command::Select {
            result_id: result_id.into(),
        })
    }

    /// Drops both result sets and the selection, and abandons in-flight
    /// queries.
    pub fn clear(&self) -> Result<()> {
        self.send(Command::Clear)
    }

    /// Shows a callout for the result nearest `point`, or dismisses the
    /// current one when nothing is close enough.
    pub fn identify(&self, point: Point) -> Result<()> {
        self.send(Command::Identify { point })
    }

    pub fn set_visible_area(&self, area: Envelope) -> Result<()> {
        self.send(Command::SetVisibleArea(area))
    }

    pub fn set_device_location(&self, point: Point) -> Result<()> {
        self.send(Command::SetDeviceLocation(point))
    }

    /// Returns the state after every command sent so far has been applied.
    pub async fn snapshot(&self) -> Result<WorkflowSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply))?;
        rx.await.map_err(|_| stopped())
    }

    /// Stops the update task and waits for it to exit.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("[Workflow] Update task ended abnormally: {}", e);
            }
        }
    }

    fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(Message::Command(command))
            .map_err(|_| stopped())
    }
}

impl Drop for SearchWorkflow {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn stopped() -> WayfindError {
    WayfindError::internal("workflow stopped")
}
