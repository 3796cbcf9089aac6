use std::io::BufRead;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use super::protocol::{Action, IceCandidateInit, Message};

/// Media-side collaborator driven by inbound call control.
///
/// The peer connection itself lives outside this crate; implementations
/// own it and share the microphone with the capture stream.
pub trait CallHandler {
    fn start_call(&mut self, client_id: &str);
    fn end_call(&mut self);
    fn sdp_answer(&mut self, sdp: &str);
    fn ice_candidate(&mut self, candidate: IceCandidateInit);
    fn has_active_call(&self) -> bool;
}

/// Handler used when no media transport is wired in: records call state and
/// logs every request.
#[derive(Debug, Default)]
pub struct LoggingCallHandler {
    active_client: Option<String>,
    candidates: usize,
}

impl LoggingCallHandler {
    pub fn active_client(&self) -> Option<&str> {
        self.active_client.as_deref()
    }

    pub fn candidates_received(&self) -> usize {
        self.candidates
    }
}

impl CallHandler for LoggingCallHandler {
    fn start_call(&mut self, client_id: &str) {
        info!(client_id, "call requested; no media transport configured");
        self.active_client = Some(client_id.to_string());
        self.candidates = 0;
    }

    fn end_call(&mut self) {
        if let Some(client_id) = self.active_client.take() {
            info!(client_id = %client_id, "call ended");
        }
    }

    fn sdp_answer(&mut self, sdp: &str) {
        debug!(bytes = sdp.len(), "sdp answer received");
    }

    fn ice_candidate(&mut self, candidate: IceCandidateInit) {
        self.candidates += 1;
        debug!(candidate = %candidate.candidate, "ice candidate received");
    }

    fn has_active_call(&self) -> bool {
        self.active_client.is_some()
    }
}

/// Parses inbound envelopes and dispatches call control to a [`CallHandler`].
pub struct ControlRouter<H> {
    handler: H,
}

impl<H: CallHandler> ControlRouter<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handle one JSON line. Returns the action that was dispatched, or
    /// `None` for blank or malformed input.
    pub fn handle_line(&mut self, line: &str) -> Option<Action> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        match serde_json::from_str::<Message>(trimmed) {
            Ok(message) => {
                let action = message.action;
                self.dispatch(message);
                Some(action)
            }
            Err(err) => {
                error!(error = %err, "invalid control message");
                None
            }
        }
    }

    pub fn dispatch(&mut self, message: Message) {
        match message.action {
            Action::StartCall => {
                // A new call always replaces the current one.
                if self.handler.has_active_call() {
                    self.handler.end_call();
                }
                self.handler.start_call(&message.client_id);
            }
            Action::EndCall => {
                if self.handler.has_active_call() {
                    self.handler.end_call();
                } else {
                    debug!("endCall without an active call");
                }
            }
            Action::SdpAnswer => {
                if !self.handler.has_active_call() {
                    warn!("sdpAnswer without an active call; ignoring");
                    return;
                }
                self.handler.sdp_answer(&message.data);
            }
            Action::ReceiveIceCandidate => {
                if !self.handler.has_active_call() {
                    warn!("ice candidate without an active call; ignoring");
                    return;
                }
                match serde_json::from_str::<IceCandidateInit>(&message.data) {
                    Ok(candidate) => self.handler.ice_candidate(candidate),
                    Err(err) => error!(error = %err, "failed to parse ice candidate"),
                }
            }
            other => debug!(action = ?other, "ignoring control message"),
        }
    }

    /// Feed every line of `input` through the router until EOF or a read error.
    pub fn run<R: BufRead>(&mut self, input: R) -> Result<()> {
        for line in input.lines() {
            let line = line.context("failed to read control input")?;
            self.handle_line(&line);
        }
        Ok(())
    }
}

/// Read control envelopes from stdin on a background thread.
pub fn spawn_control_reader<H>(handler: H) -> Result<JoinHandle<()>>
where
    H: CallHandler + Send + 'static,
{
    thread::Builder::new()
        .name("soundwatch-control".to_string())
        .spawn(move || {
            let mut router = ControlRouter::new(handler);
            let stdin = std::io::stdin();
            if let Err(err) = router.run(stdin.lock()) {
                warn!(error = %err, "control reader stopped");
            }
        })
        .context("failed to spawn control reader")
}
