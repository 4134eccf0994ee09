//! Thread de fond simulant la latence du service distant

use std::{
    io,
    thread::{self, JoinHandle},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use plsreactor::WakeSignal;
use tracing::{debug, trace};

use crate::{link::PlaylistLink, model::ResourceKey};

#[derive(Debug, Clone)]
pub(crate) enum Job {
    Load(ResourceKey),
    Commit(PlaylistLink),
    Subscribers(PlaylistLink),
    Inbox(u64),
}

#[derive(Debug, Clone)]
pub(crate) enum Completion {
    Loaded(ResourceKey),
    Committed(PlaylistLink),
    SubscribersRefreshed(PlaylistLink),
    Delivered(u64),
}

pub(crate) struct Worker {
    jobs: Receiver<Job>,
    done: Sender<Completion>,
    wake: WakeSignal,
    load_latency: Duration,
    commit_latency: Duration,
}

impl Worker {
    pub(crate) fn new(
        jobs: Receiver<Job>,
        done: Sender<Completion>,
        wake: WakeSignal,
        load_latency: Duration,
        commit_latency: Duration,
    ) -> Self {
        Self {
            jobs,
            done,
            wake,
            load_latency,
            commit_latency,
        }
    }

    pub(crate) fn spawn(self) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("pls-session-worker".into())
            .spawn(move || self.run())
    }

    /// Jobs complete in submission order. Stops when the job sender is
    /// dropped or the reactor went away.
    fn run(self) {
        for job in self.jobs.iter() {
            let (delay, completion) = match job {
                Job::Load(key) => (self.load_latency, Completion::Loaded(key)),
                Job::Commit(link) => (self.commit_latency, Completion::Committed(link)),
                Job::Subscribers(link) => {
                    (self.load_latency, Completion::SubscribersRefreshed(link))
                }
                Job::Inbox(post) => (self.commit_latency, Completion::Delivered(post)),
            };
            if !delay.is_zero() {
                thread::sleep(delay);
            }

            trace!(?completion, "job completed");
            if self.done.send(completion).is_err() || !self.wake.notify() {
                debug!("session gone, worker exiting");
                return;
            }
        }
        debug!("job queue closed, worker exiting");
    }
}
