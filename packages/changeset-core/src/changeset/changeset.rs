use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::config::ChangesetOptions;
use crate::content::Content;
use crate::entries::{error_entries, to_entries, Entry, ErrorEntry};
use crate::error::{ChangesetError, Result};
use crate::object;
use crate::path;
use crate::validation::{
    ErrorInput, ErrorRecord, Validation, ValidationArgs, ValidationMap, ValidationResult,
    Validator, ValidatorOutput,
};

use super::buffers::{Buffers, Changes, Errors, Snapshot};
use super::events::{ChangesetEvent, Events};
use super::pending::{PendingWrite, WriteStatus};
use super::relay::{Property, Relay};

/// Mutable state guarded by a single lock.
struct State<C: Content> {
    buffers: Buffers,
    /// In-flight asynchronous validations per key; present iff > 0
    running: HashMap<String, usize>,
    /// Relays handed out for nested keys
    relays: HashMap<String, Relay<C>>,
}

impl<C: Content> State<C> {
    /// Forgets relays for `key` and everything nested under it.
    fn invalidate_relays(&mut self, key: &str) {
        self.relays.retain(|cached, _| !path::is_within(cached, key));
    }
}

pub(crate) struct Inner<C: Content> {
    content: Arc<RwLock<C>>,
    validator: Option<Validator>,
    validation_map: ValidationMap,
    options: ChangesetOptions,
    events: Events,
    state: Mutex<State<C>>,
}

/// Buffers edits to a content object until they are executed.
///
/// Writes are validated and land either in the changes buffer or in the
/// errors buffer; the content is only touched by [`Changeset::execute`] and
/// [`Changeset::save`]. Cloning yields another handle to the same
/// changeset.
pub struct Changeset<C: Content> {
    inner: Arc<Inner<C>>,
}

impl<C: Content> Clone for Changeset<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Content> Changeset<C> {
    /// Creates a changeset over `content`.
    ///
    /// # Arguments
    /// * `content` - Object to wrap; the caller keeps its own handle
    /// * `validator` - Validates every write; `None` accepts everything
    /// * `validation_map` - Keys checked by `validate_all`/`validate_one`
    /// * `options` - Changeset options
    pub fn new(
        content: Arc<RwLock<C>>,
        validator: Option<Validator>,
        validation_map: ValidationMap,
        options: ChangesetOptions,
    ) -> Self {
        Self::from_parts(content, validator, validation_map, options, Buffers::default())
    }

    /// Creates a changeset without validation.
    pub fn with_content(content: Arc<RwLock<C>>) -> Self {
        Self::new(content, None, ValidationMap::new(), ChangesetOptions::default())
    }

    fn from_parts(
        content: Arc<RwLock<C>>,
        validator: Option<Validator>,
        validation_map: ValidationMap,
        options: ChangesetOptions,
        buffers: Buffers,
    ) -> Self {
        let events = Events::new(options.event_capacity);
        Self {
            inner: Arc::new(Inner {
                content,
                validator,
                validation_map,
                options,
                events,
                state: Mutex::new(State {
                    buffers,
                    running: HashMap::new(),
                    relays: HashMap::new(),
                }),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<Inner<C>>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<Inner<C>> {
        Arc::downgrade(&self.inner)
    }

    /// The wrapped content.
    pub fn content(&self) -> &Arc<RwLock<C>> {
        &self.inner.content
    }

    pub fn options(&self) -> &ChangesetOptions {
        &self.inner.options
    }

    pub fn validation_map(&self) -> &ValidationMap {
        &self.inner.validation_map
    }

    /// Returns `true` if both handles refer to the same changeset.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Subscribes to validation and property-change events.
    pub fn subscribe(&self) -> broadcast::Receiver<ChangesetEvent> {
        self.inner.events.subscribe()
    }

    /// Returns whether the errors buffer is empty.
    pub fn is_valid(&self) -> bool {
        self.inner.state.lock().buffers.errors.is_empty()
    }

    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// Returns whether the changes buffer is empty.
    pub fn is_pristine(&self) -> bool {
        self.inner.state.lock().buffers.changes.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        !self.is_pristine()
    }

    /// Pending changes as ordered top-level `{key, value}` entries.
    pub fn changes(&self) -> Vec<Entry<Value>> {
        to_entries(&self.inner.state.lock().buffers.changes)
    }

    /// Errors as ordered `{key, value, validation}` entries.
    pub fn errors(&self) -> Vec<ErrorEntry> {
        error_entries(&self.inner.state.lock().buffers.errors)
    }

    /// Copy of the changes buffer.
    pub fn change(&self) -> Changes {
        self.inner.state.lock().buffers.changes.clone()
    }

    /// Copy of the errors buffer.
    pub fn error(&self) -> Errors {
        self.inner.state.lock().buffers.errors.clone()
    }

    fn original(&self, key: &str) -> Option<Value> {
        self.inner.content.read().get(key)
    }

    /// Reads `key`.
    ///
    /// Priority: the value of an error at `key`, a cached relay, the value
    /// written at `key` (or inside a value written above it), a fresh relay
    /// when the content or the nested changes hold a mapping, and finally
    /// the raw content value (`null` if unset).
    pub fn get(&self, key: &str) -> Property<C> {
        let original = self.original(key);
        let mut state = self.inner.state.lock();

        if let Some(record) = state.buffers.errors.get(key) {
            return Property::Value(record.value.clone());
        }
        if let Some(relay) = state.relays.get(key) {
            return Property::Relay(relay.clone());
        }
        if state.buffers.written_ancestor(key).is_some() {
            let change = path::get(&state.buffers.changes, key).cloned();
            return Property::Value(change.unwrap_or(Value::Null));
        }
        match path::get(&state.buffers.changes, key) {
            Some(change) if !change.is_object() => return Property::Value(change.clone()),
            Some(_) => {}
            None if !original.as_ref().is_some_and(object::is_object) => {
                return Property::Value(original.unwrap_or(Value::Null));
            }
            None => {}
        }

        let relay = Relay::new(key, self.downgrade());
        state.relays.insert(key.to_string(), relay.clone());
        Property::Relay(relay)
    }

    /// Reads `key` as a plain value, materializing nested relays.
    pub fn read(&self, key: &str) -> Value {
        self.get(key).into_value()
    }

    /// Attempts to set `key` to `value`.
    ///
    /// The value is validated against the content's current value at `key`.
    /// Accepted values become pending changes (or clear the pending change if
    /// equal to the content value); rejected values become errors.
    ///
    /// # Returns
    /// `WriteStatus::Pending` when the validator is asynchronous; the
    /// buffers are then updated once validation completes.
    pub fn write(&self, key: &str, value: Value) -> Result<WriteStatus> {
        if self.inner.options.skip_validate {
            let old_value = self.original(key).unwrap_or(Value::Null);
            self.apply(key, value, &old_value, &ValidationResult::Valid)?;
            return Ok(WriteStatus::Settled(ValidationResult::Valid));
        }

        let guard = ValidatingGuard::new(self.clone(), key);
        let (old_value, output) = self.run_validator(key, &value);
        match output {
            ValidatorOutput::Sync(result) => {
                drop(guard);
                self.apply(key, value, &old_value, &result)?;
                Ok(WriteStatus::Settled(result))
            }
            ValidatorOutput::Pending(future) => {
                let runtime = Handle::try_current().map_err(|_| ChangesetError::NoAsyncRuntime {
                    key: key.to_string(),
                })?;
                tracing::debug!("Validating {} asynchronously", key);

                let changeset = self.clone();
                let task_key = key.to_string();
                let task = runtime.spawn(async move {
                    let result = future.await;
                    drop(guard);
                    changeset.apply(&task_key, value, &old_value, &result)?;
                    Ok(result)
                });
                Ok(WriteStatus::Pending(PendingWrite::new(key, task)))
            }
        }
    }

    fn run_validator(&self, key: &str, value: &Value) -> (Value, ValidatorOutput) {
        let changes = self.change();
        let content = self.inner.content.read();
        let old_value = content.get(key).unwrap_or(Value::Null);

        let output = match &self.inner.validator {
            Some(validator) => validator.validate(ValidationArgs {
                key,
                new_value: value,
                old_value: &old_value,
                changes: &changes,
                content: &*content,
            }),
            None => ValidatorOutput::Sync(ValidationResult::Valid),
        };
        (old_value, output)
    }

    /// Lands a verdict in the buffers.
    fn apply(
        &self,
        key: &str,
        value: Value,
        old_value: &Value,
        result: &ValidationResult,
    ) -> Result<()> {
        let mut state = self.inner.state.lock();
        state.invalidate_relays(key);

        match result {
            ValidationResult::Valid => {
                state.buffers.errors.shift_remove(key);
                if value != *old_value {
                    state.buffers.stage_change(key, value);
                } else {
                    state.buffers.unstage_change(key)?;
                }
                tracing::debug!("Accepted write to {}", key);
            }
            ValidationResult::Invalid(validation) => {
                tracing::debug!("Rejected write to {}: {:?}", key, validation);
                state
                    .buffers
                    .stage_error(key, ErrorRecord::new(value, validation.clone()))?;
            }
        }
        drop(state);

        self.emit(ChangesetEvent::PropertyChanged(key.to_string()));
        Ok(())
    }

    fn emit(&self, event: ChangesetEvent) {
        self.inner.events.emit(event);
    }

    fn begin_validating(&self, key: &str) {
        let mut state = self.inner.state.lock();
        *state.running.entry(key.to_string()).or_insert(0) += 1;
    }

    fn end_validating(&self, key: &str) {
        let mut state = self.inner.state.lock();
        if let Some(count) = state.running.get_mut(key) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.running.remove(key);
            }
        }
    }

    /// Returns `true` if `key` (or, with `None`, any key) has a validation
    /// in flight.
    pub fn is_validating(&self, key: Option<&str>) -> bool {
        let state = self.inner.state.lock();
        match key {
            Some(key) => state.running.contains_key(key),
            None => !state.running.is_empty(),
        }
    }

    /// Re-validates every key declared in the validation map.
    ///
    /// Validations run concurrently; this resolves once all have landed in
    /// the buffers. Rejections are recorded as errors, not returned.
    pub async fn validate_all(&self) -> Result<()> {
        if self.inner.validation_map.is_empty() {
            return Ok(());
        }

        let keys: Vec<String> = self.inner.validation_map.keys().map(str::to_string).collect();
        let mut pending = Vec::new();
        for key in &keys {
            let value = self.read(key);
            if let WriteStatus::Pending(write) = self.write(key, value)? {
                pending.push(write);
            }
        }

        let mut first_error = None;
        for write in pending {
            if let Err(e) = write.settled().await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Re-validates a single key with its current value.
    ///
    /// No-op when the validation map is empty.
    pub async fn validate_one(&self, key: &str) -> Result<()> {
        if self.inner.validation_map.is_empty() {
            return Ok(());
        }
        let value = self.read(key);
        self.write(key, value)?.settled().await?;
        Ok(())
    }

    /// Marks `key` invalid.
    ///
    /// A bare validation is paired with the current value of `key`. Any
    /// pending change at `key` is evicted.
    pub fn add_error(&self, key: &str, error: impl Into<ErrorInput>) -> Result<ErrorRecord> {
        let record = match error.into() {
            ErrorInput::Record(record) => record,
            ErrorInput::Validation(validation) => ErrorRecord::new(self.read(key), validation),
        };

        self.inner
            .state
            .lock()
            .buffers
            .stage_error(key, record.clone())?;
        self.emit(ChangesetEvent::PropertyChanged(key.to_string()));
        Ok(record)
    }

    /// Appends messages to the validation at `key`.
    ///
    /// An existing single message is promoted to a list first. Any pending
    /// change at `key` is evicted.
    pub fn push_errors<I, S>(&self, key: &str, messages: I) -> Result<ErrorRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let value = self.read(key);
        let mut state = self.inner.state.lock();

        let mut list = state
            .buffers
            .errors
            .get(key)
            .map(|record| record.validation.clone().into_messages())
            .unwrap_or_default();
        list.extend(messages.into_iter().map(Into::into));

        let record = ErrorRecord::new(value, Validation::Messages(list));
        state.buffers.stage_error(key, record.clone())?;
        drop(state);

        self.emit(ChangesetEvent::PropertyChanged(key.to_string()));
        Ok(record)
    }

    /// Replaces the changes buffer with what `prepare` makes of a copy of it.
    ///
    /// # Returns
    /// `ChangesetError::PrepareNotMapping` if `prepare` does not return a
    /// mapping; the buffer is left untouched in that case.
    pub fn prepare<F>(&self, prepare: F) -> Result<&Self>
    where
        F: FnOnce(Changes) -> Value,
    {
        match prepare(self.change()) {
            Value::Object(prepared) => {
                let mut state = self.inner.state.lock();
                state.buffers.replace_changes(prepared);
                state.relays.clear();
                Ok(self)
            }
            _ => Err(ChangesetError::PrepareNotMapping),
        }
    }

    /// Applies pending changes to the content if valid and dirty.
    ///
    /// Each written path is assigned its pending value as a whole. The
    /// buffers are kept; see [`Changeset::save`].
    pub fn execute(&self) -> &Self {
        let writes = {
            let state = self.inner.state.lock();
            if !state.buffers.errors.is_empty() || state.buffers.changes.is_empty() {
                return self;
            }
            state.buffers.written_changes()
        };

        let count = writes.len();
        let mut content = self.inner.content.write();
        for (key, value) in writes {
            content.set(&key, value);
        }
        tracing::debug!("Executed {} pending changes", count);
        self
    }

    /// Executes, persists the content if it has a save operation, and
    /// clears the buffers on success.
    ///
    /// # Returns
    /// The content's save result, or `None` if the content cannot save.
    /// A rejected save leaves the buffers intact.
    pub async fn save(&self, options: Option<Value>) -> Result<Option<Value>> {
        self.execute();

        let pending = self.inner.content.write().save(options);
        let Some(pending) = pending else {
            self.rollback();
            return Ok(None);
        };

        match pending.await {
            Ok(result) => {
                self.rollback();
                Ok(Some(result))
            }
            Err(e) => {
                tracing::warn!("Save failed, keeping pending changes: {}", e);
                Err(ChangesetError::SaveFailed(e.to_string()))
            }
        }
    }

    /// Discards all changes and errors.
    ///
    /// Validations already in flight still land when they complete.
    pub fn rollback(&self) -> &Self {
        let keys = {
            let mut state = self.inner.state.lock();
            let keys = state.buffers.touched_keys();
            state.buffers.clear();
            state.relays.clear();
            keys
        };

        tracing::debug!("Rolled back {} keys", keys.len());
        for key in keys {
            self.emit(ChangesetEvent::PropertyChanged(key));
        }
        self
    }

    /// Combines this changeset with `other` into a new changeset.
    ///
    /// `other` wins per key: paths erroring in `other` are dropped from our
    /// changes and paths changed in `other` are dropped from our errors
    /// before `other`'s buffers are laid over ours. Neither input is
    /// modified. If both are pristine, `self` is returned.
    pub fn merge(&self, other: &Self) -> Result<Self> {
        if !Arc::ptr_eq(&self.inner.content, &other.inner.content) {
            return Err(ChangesetError::ContentMismatch);
        }
        if self.is_pristine() && other.is_pristine() {
            return Ok(self.clone());
        }

        let mut buffers = Buffers::from(self.snapshot());
        let theirs = Buffers::from(other.snapshot());

        for key in theirs.errors.keys() {
            buffers.unstage_change(key)?;
        }
        for (key, value) in theirs.written_changes() {
            buffers.stage_change(&key, value);
        }
        buffers
            .errors
            .retain(|key, _| !path::has(&theirs.changes, key));
        buffers.errors.extend(theirs.errors);

        tracing::debug!(
            "Merged changesets into {} changes and {} errors",
            buffers.changes.len(),
            buffers.errors.len()
        );
        Ok(Self::from_parts(
            Arc::clone(&self.inner.content),
            self.inner.validator.clone(),
            self.inner.validation_map.clone(),
            self.inner.options.clone(),
            buffers,
        ))
    }

    /// Copies the buffers as they are now.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.state.lock().buffers.snapshot()
    }

    /// Replaces both buffers with the snapshot's.
    pub fn restore(&self, snapshot: Snapshot) -> &Self {
        let keys = {
            let mut state = self.inner.state.lock();
            let mut keys = state.buffers.touched_keys();
            state.buffers = Buffers::from(snapshot);
            keys.extend(state.buffers.touched_keys());
            state.relays.clear();
            keys
        };

        tracing::debug!("Restored snapshot touching {} keys", keys.len());
        for key in keys {
            self.emit(ChangesetEvent::PropertyChanged(key));
        }
        self
    }

    /// Keeps only the changes whose top-level key is in `allowed`.
    ///
    /// An empty list keeps everything. Errors are untouched.
    pub fn cast<K: AsRef<str>>(&self, allowed: &[K]) -> &Self {
        if allowed.is_empty() {
            return self;
        }

        let mut state = self.inner.state.lock();
        let kept = object::pick(allowed, &state.buffers.changes);
        tracing::debug!(
            "Cast dropped {} top-level changes",
            state.buffers.changes.len() - kept.len()
        );
        state.buffers.changes = kept;
        state
            .buffers
            .retain_written(|key| allowed.iter().any(|k| path::is_within(key, k.as_ref())));
        state.relays.clear();
        self
    }

    /// Content subtree at `prefix` with the values written underneath it
    /// and error values laid over it.
    pub(crate) fn nested_value(&self, prefix: &str) -> Value {
        let mut map = match self.original(prefix) {
            Some(Value::Object(original)) => original,
            _ => Map::new(),
        };

        let state = self.inner.state.lock();
        if state.buffers.written_ancestor(prefix).is_some() {
            let change = path::get(&state.buffers.changes, prefix).cloned();
            return change.unwrap_or(Value::Null);
        }
        for (key, value) in state.buffers.written_changes() {
            if let Some(rest) = relative_to(&key, prefix) {
                path::set(&mut map, rest, value);
            }
        }
        for (key, record) in &state.buffers.errors {
            if let Some(rest) = relative_to(key, prefix) {
                path::set(&mut map, rest, record.value.clone());
            }
        }
        Value::Object(map)
    }

    /// Pending changes under `prefix`.
    pub(crate) fn nested_changes(&self, prefix: &str) -> Changes {
        let state = self.inner.state.lock();
        path::get(&state.buffers.changes, prefix)
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns `true` if any error sits at or under `prefix`.
    pub(crate) fn has_errors_within(&self, prefix: &str) -> bool {
        let state = self.inner.state.lock();
        state
            .buffers
            .errors
            .keys()
            .any(|key| path::is_within(key, prefix))
    }
}

impl<C: Content> fmt::Debug for Changeset<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Changeset")
            .field("changes", &state.buffers.changes)
            .field("errors", &state.buffers.errors)
            .field("running", &state.running)
            .finish_non_exhaustive()
    }
}

/// `path` relative to `prefix`, if it lies strictly underneath it.
fn relative_to<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)?.strip_prefix('.')
}

/// Brackets one validation of a key.
///
/// Creating it counts the key as validating and announces
/// `BeforeValidation`. Dropping it, including while unwinding out of a
/// panicking validator, decrements the count and announces
/// `AfterValidation`.
struct ValidatingGuard<C: Content> {
    changeset: Changeset<C>,
    key: String,
}

impl<C: Content> ValidatingGuard<C> {
    fn new(changeset: Changeset<C>, key: &str) -> Self {
        changeset.begin_validating(key);
        changeset.emit(ChangesetEvent::BeforeValidation(key.to_string()));
        Self {
            changeset,
            key: key.to_string(),
        }
    }
}

impl<C: Content> Drop for ValidatingGuard<C> {
    fn drop(&mut self) {
        self.changeset.end_validating(&self.key);
        self.changeset
            .emit(ChangesetEvent::AfterValidation(self.key.clone()));
    }
}
