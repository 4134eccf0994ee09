use crossbeam_channel::Sender;
use plsdiff::OrderedCollection;
use tracing::debug;

use super::{Entry, worker::Job};
use crate::{error::SessionError, link::TrackLink};

/// Mutable view of a loaded in-memory playlist.
///
/// Every accepted mutation is visible at once and queues a commit; the
/// playlist has pending changes until the worker confirmed all of them.
pub struct MemoryEditor<'a> {
    pub(super) entry: &'a mut Entry,
    pub(super) user: &'a str,
    pub(super) jobs: &'a Sender<Job>,
    pub(super) max_tracks: usize,
}

impl MemoryEditor<'_> {
    fn check_permission(&self) -> Result<(), SessionError> {
        if self.entry.playlist.editable_by(self.user) {
            Ok(())
        } else {
            Err(SessionError::PermissionDenied(self.entry.playlist.link.to_string()))
        }
    }

    fn commit(&mut self) -> Result<(), SessionError> {
        self.jobs
            .send(Job::Commit(self.entry.playlist.link.clone()))
            .map_err(|_| SessionError::LoggedOut)?;
        self.entry.pending_commits += 1;
        Ok(())
    }
}

impl OrderedCollection for MemoryEditor<'_> {
    type Token = TrackLink;
    type Error = SessionError;

    fn len(&self) -> usize {
        self.entry.playlist.tracks.len()
    }

    fn get(&self, index: usize) -> Option<&TrackLink> {
        self.entry.playlist.tracks.get(index)
    }

    fn insert_at(&mut self, index: usize, tokens: Vec<TrackLink>) -> Result<(), SessionError> {
        self.check_permission()?;
        let len = self.len();
        if index > len {
            return Err(SessionError::InvalidIndex { index, len });
        }
        if tokens.is_empty() {
            return Ok(());
        }
        if len + tokens.len() > self.max_tracks {
            return Err(SessionError::CapacityExceeded {
                limit: self.max_tracks,
            });
        }

        self.commit()?;
        debug!(playlist = %self.entry.playlist.link, index, count = tokens.len(), "tracks inserted");
        self.entry.playlist.tracks.splice(index..index, tokens);
        Ok(())
    }

    fn remove_at(&mut self, indices: &[usize]) -> Result<(), SessionError> {
        self.check_permission()?;
        let len = self.len();
        if let Some(&index) = indices.iter().find(|&&i| i >= len) {
            return Err(SessionError::InvalidIndex { index, len });
        }
        if indices.is_empty() {
            return Ok(());
        }

        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        self.commit()?;
        debug!(playlist = %self.entry.playlist.link, count = sorted.len(), "tracks removed");
        for index in sorted.into_iter().rev() {
            self.entry.playlist.tracks.remove(index);
        }
        Ok(())
    }

    fn has_pending_changes(&self) -> bool {
        self.entry.pending_commits > 0
    }
}
