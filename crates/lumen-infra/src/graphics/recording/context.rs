// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;

use lumen_core::context::GpuContextId;
use lumen_core::renderer::{DisplayListId, GpuCommand, GraphicsContext, RenderError};

use super::BackendError;

#[derive(Debug)]
struct ActiveRecording {
    list: DisplayListId,
    commands: Vec<GpuCommand>,
    failure: Option<BackendError>,
}

/// A GPU context that executes commands into a log.
///
/// Replaying a list appends the list's commands to the log, expanding nested
/// replays, so a replayed frame can be compared command-for-command with a
/// traversed one.
#[derive(Debug)]
pub struct RecordingContext {
    id: GpuContextId,
    executed: Vec<GpuCommand>,
    lists: HashMap<DisplayListId, Vec<GpuCommand>>,
    recording: Option<ActiveRecording>,
    next_list: u64,
    list_memory_limit: Option<usize>,
    stored_commands: usize,
    pending_error: Option<RenderError>,
    deleted_lists: usize,
}

impl RecordingContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new(id: GpuContextId) -> Self {
        Self {
            id,
            executed: Vec::new(),
            lists: HashMap::new(),
            recording: None,
            next_list: 1,
            list_memory_limit: None,
            stored_commands: 0,
            pending_error: None,
            deleted_lists: 0,
        }
    }

    /// Limits the total number of commands stored in display lists.
    /// Recordings that would exceed it fail with an out-of-memory error.
    #[must_use]
    pub fn with_list_memory_limit(mut self, limit: usize) -> Self {
        self.list_memory_limit = Some(limit);
        self
    }

    /// Every command executed so far, replays expanded.
    pub fn executed(&self) -> &[GpuCommand] {
        &self.executed
    }

    /// Returns and clears the execution log.
    pub fn take_executed(&mut self) -> Vec<GpuCommand> {
        std::mem::take(&mut self.executed)
    }

    /// Number of draw commands executed so far.
    pub fn draw_count(&self) -> usize {
        self.executed.iter().filter(|c| c.is_draw()).count()
    }

    /// Number of live display lists.
    pub fn list_count(&self) -> usize {
        self.lists.len()
    }

    /// Number of display lists deleted so far.
    pub fn deleted_list_count(&self) -> usize {
        self.deleted_lists
    }

    /// Returns `true` if `list` was recorded and not deleted.
    pub fn is_list_alive(&self, list: DisplayListId) -> bool {
        self.lists.contains_key(&list)
    }

    /// The commands recorded in `list`.
    pub fn list_commands(&self, list: DisplayListId) -> Option<&[GpuCommand]> {
        self.lists.get(&list).map(Vec::as_slice)
    }

    fn raise(&mut self, err: impl Into<RenderError>) {
        let err = err.into();
        log::trace!("{}: {err}", self.id);
        if self.pending_error.is_none() {
            self.pending_error = Some(err);
        }
    }

    fn capture(&mut self, command: &GpuCommand) {
        let limit = self.list_memory_limit;
        let stored = self.stored_commands;
        let Some(recording) = self.recording.as_mut() else {
            return;
        };
        if recording.failure.is_some() {
            return;
        }
        if let Some(limit) = limit {
            if stored + recording.commands.len() >= limit {
                let err = BackendError::ListMemoryExhausted { limit };
                recording.failure = Some(err.clone());
                recording.commands.clear();
                self.raise(err);
                return;
            }
        }
        recording.commands.push(command.clone());
    }

    fn execute(&mut self, command: GpuCommand) {
        match command {
            GpuCommand::CallList(list) => {
                let Some(commands) = self.lists.get(&list).cloned() else {
                    self.raise(BackendError::UnknownList(list));
                    return;
                };
                for command in commands {
                    self.execute(command);
                }
            }
            command => self.executed.push(command),
        }
    }
}

impl GraphicsContext for RecordingContext {
    fn context_id(&self) -> GpuContextId {
        self.id
    }

    fn submit(&mut self, command: GpuCommand) {
        self.capture(&command);
        self.execute(command);
    }

    fn begin_list(&mut self) -> Result<DisplayListId, RenderError> {
        if self.recording.is_some() {
            return Err(RenderError::RecordingInProgress);
        }
        let list = DisplayListId(self.next_list);
        self.next_list += 1;
        self.recording = Some(ActiveRecording {
            list,
            commands: Vec::new(),
            failure: None,
        });
        Ok(list)
    }

    fn end_list(&mut self, list: DisplayListId) -> Result<(), RenderError> {
        let recording = match self.recording.take() {
            Some(recording) if recording.list == list => recording,
            Some(other) => {
                self.recording = Some(other);
                return Err(BackendError::UnknownList(list).into());
            }
            None => return Err(RenderError::NotRecording),
        };
        if let Some(failure) = recording.failure {
            return Err(failure.into());
        }
        self.stored_commands += recording.commands.len();
        self.lists.insert(list, recording.commands);
        Ok(())
    }

    fn call_list(&mut self, list: DisplayListId) {
        self.submit(GpuCommand::CallList(list));
    }

    fn delete_list(&mut self, list: DisplayListId) {
        if self.recording.as_ref().is_some_and(|r| r.list == list) {
            log::warn!("{}: deleting {list:?} while it is being recorded.", self.id);
            self.recording = None;
            self.deleted_lists += 1;
            return;
        }
        if let Some(commands) = self.lists.remove(&list) {
            self.stored_commands -= commands.len();
            self.deleted_lists += 1;
        }
    }

    fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    fn take_error(&mut self) -> Option<RenderError> {
        self.pending_error.take()
    }
}
