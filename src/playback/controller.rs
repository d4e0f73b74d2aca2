// src/playback/controller.rs
use crate::config::ClientConfig;
use crate::errors::PlaybackError;
use crate::playback::engine::{EventSink, MediaEngine, ObserverHandle, Player};
use crate::playback::events::{
    Command, CommandStatus, ControllerEvent, EngineEvent, Interruption, RemoteCommand, SessionId,
};
use crate::playback::handle::{
    InterruptionSink, InterruptionSource, PlaybackHandle, RemoteCommandSurface, RemoteTarget,
};
use crate::playback::state::{PlaybackPhase, PlaybackSnapshot};
use crate::podcast::{Episode, Feed};
use log::{debug, error, info, trace, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::sync::{mpsc, watch};

/// One loaded episode plus the observers registered against it.
struct Session<P: Player> {
    id: SessionId,
    player: P,
    tick_observer: Option<ObserverHandle>,
    end_observer: Option<ObserverHandle>,
}

impl<P: Player> Session<P> {
    /// Stop, unregister the tick observer, unregister the end observer, then
    /// drop the player. Nothing registered against it survives this call.
    fn release(mut self) {
        self.player.pause();
        if let Some(token) = self.tick_observer.take() {
            self.player.remove_observer(token);
        }
        if let Some(token) = self.end_observer.take() {
            self.player.remove_observer(token);
        }
        drop(self.player);
    }
}

fn engine_progress<P: Player>(player: &P) -> Option<f64> {
    let total = player.duration()?.as_secs_f64();
    if total <= 0.0 {
        return None;
    }
    let current = player.current_time()?.as_secs_f64();
    Some((current / total).clamp(0.0, 1.0))
}

/// Owns the single playback session and every piece of state derived from it.
///
/// All mutation happens through `&mut self`, either called directly by the
/// owner or via [`PlaybackController::run`], which applies queued engine
/// callbacks, remote commands, interruptions and [`PlaybackHandle`] requests in
/// arrival order on one task.
pub struct PlaybackController<E: MediaEngine> {
    engine: E,
    session: Option<Session<E::Player>>,
    last_session_id: u64,
    phase: PlaybackPhase,
    selected_feed: Option<Feed>,
    current_episode: Option<Episode>,
    is_playing: bool,
    progress: f64,
    resume_after_interruption: bool,
    rng: StdRng,
    tick_interval: Duration,
    state_tx: watch::Sender<PlaybackSnapshot>,
    events_tx: mpsc::UnboundedSender<ControllerEvent>,
    events_rx: mpsc::UnboundedReceiver<ControllerEvent>,
}

impl<E: MediaEngine> PlaybackController<E> {
    pub fn new(engine: E) -> Self {
        let (state_tx, _) = watch::channel(PlaybackSnapshot::default());
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            engine,
            session: None,
            last_session_id: 0,
            phase: PlaybackPhase::Idle,
            selected_feed: None,
            current_episode: None,
            is_playing: false,
            progress: 0.0,
            resume_after_interruption: false,
            rng: StdRng::from_os_rng(),
            tick_interval: Duration::from_secs(1),
            state_tx,
            events_tx,
            events_rx,
        }
    }

    pub fn from_config(engine: E, config: &ClientConfig) -> Self {
        Self::new(engine).with_tick_interval(config.tick_interval())
    }

    // Builder methods
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    // ================================ Collaborator wiring =====================================

    pub fn subscribe(&self) -> watch::Receiver<PlaybackSnapshot> {
        self.state_tx.subscribe()
    }

    pub fn handle(&self) -> PlaybackHandle {
        PlaybackHandle::new(self.events_tx.clone(), self.state_tx.subscribe())
    }

    pub fn connect_remote(&self, surface: &mut dyn RemoteCommandSurface) {
        surface.register(RemoteTarget::new(self.events_tx.clone()));
    }

    pub fn connect_interruptions(&self, source: &mut dyn InterruptionSource) {
        source.register(InterruptionSink::new(self.events_tx.clone()));
    }

    // ==================================== Accessors ===========================================

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn current_episode(&self) -> Option<&Episode> {
        self.current_episode.as_ref()
    }

    pub fn selected_feed(&self) -> Option<&Feed> {
        self.selected_feed.as_ref()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn progress(&self) -> f64 {
        self.progress
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            phase: self.phase,
            feed_id: self.selected_feed.as_ref().map(Feed::id),
            feed_name: self.selected_feed.as_ref().map(|f| f.name().to_string()),
            episode: self.current_episode.clone(),
            is_playing: self.is_playing,
            progress: self.progress,
        }
    }

    fn publish(&self) {
        self.state_tx.send_replace(self.snapshot());
    }

    // ==================================== Operations ==========================================

    /// Replaces whatever is playing with `episode`. The previous session is
    /// fully released before the engine is asked to load the new one.
    pub fn play(&mut self, episode: Episode, feed: Feed) -> Result<(), PlaybackError> {
        self.teardown_session();
        self.clear_playback_state();
        self.phase = PlaybackPhase::Loading;
        self.selected_feed = Some(feed);
        self.current_episode = Some(episode.clone());
        self.publish();

        self.last_session_id += 1;
        let id = SessionId(self.last_session_id);

        let mut player = match self.engine.load(episode.audio_url()) {
            Ok(player) => player,
            Err(e) => {
                error!("PlaybackController: could not load '{}': {}", episode.title(), e);
                self.phase = PlaybackPhase::Idle;
                self.current_episode = None;
                self.publish();
                return Err(PlaybackError::EngineInitFailure(e.to_string()));
            }
        };

        let tick_observer = player.on_periodic_tick(self.tick_interval, self.sink(id));
        let end_observer = player.on_reached_end(self.sink(id));
        player.play();

        self.session = Some(Session {
            id,
            player,
            tick_observer: Some(tick_observer),
            end_observer: Some(end_observer),
        });
        info!("PlaybackController: playing '{}' from '{}'", episode.title(), episode.podcast_name());
        self.current_episode = Some(episode);
        self.is_playing = true;
        self.phase = PlaybackPhase::Playing;
        self.publish();
        Ok(())
    }

    pub fn toggle_play_pause(&mut self) -> Result<(), PlaybackError> {
        let playing = !self.is_playing;
        self.set_playing(playing)?;
        self.resume_after_interruption = false;
        self.publish();
        Ok(())
    }

    /// Uniform random pick from the selected feed, repeats allowed. Explicit
    /// skips and end-of-track both come through here.
    pub fn skip_to_next(&mut self) -> Result<(), PlaybackError> {
        let Some(feed) = self.selected_feed.take() else {
            warn!("PlaybackController: skip requested with no feed selected");
            return Err(PlaybackError::NoFeedSelected);
        };

        self.teardown_session();
        self.clear_playback_state();

        if feed.episodes().is_empty() {
            warn!("PlaybackController: feed '{}' has no episodes to shuffle", feed.name());
            self.selected_feed = Some(feed);
            self.phase = PlaybackPhase::Idle;
            self.publish();
            return Err(PlaybackError::EmptyFeed);
        }

        let index = self.rng.random_range(0..feed.episodes().len());
        let episode = feed.episodes()[index].clone();
        debug!("PlaybackController: shuffled to episode {} of '{}'", index, feed.name());
        self.play(episode, feed)
    }

    /// Seeks to `fraction` of the known duration; out-of-range input is clamped
    /// and an unknown duration makes this a no-op.
    pub fn seek(&mut self, fraction: f64) -> Result<(), PlaybackError> {
        let session = self.session.as_mut().ok_or(PlaybackError::NoActiveSession)?;
        let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };

        let Some(duration) = session.player.duration().filter(|d| !d.is_zero()) else {
            debug!("PlaybackController: ignoring seek, duration not known yet");
            return Ok(());
        };
        session.player.seek(duration.mul_f64(fraction));

        if let Some(progress) = engine_progress(&session.player) {
            self.progress = progress;
        }
        self.publish();
        Ok(())
    }

    /// Releases the session and resets episode, playing flag and progress.
    /// Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.teardown_session() {
            info!("PlaybackController: stopped");
        }
        self.clear_playback_state();
        self.phase = PlaybackPhase::Idle;
        self.publish();
    }

    /// Swaps in a freshly fetched episode list if `feed` is the selected one.
    pub fn update_feed(&mut self, feed: Feed) {
        if self.selected_feed.as_ref().is_some_and(|f| f.id() == feed.id()) {
            debug!("PlaybackController: selected feed '{}' refreshed", feed.name());
            self.selected_feed = Some(feed);
            self.publish();
        }
    }

    // ================================== Event handling ========================================

    /// Applies every event already queued, without waiting. Returns how many
    /// were handled.
    pub fn process_pending(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            handled += 1;
            if !self.handle_event(event) {
                break;
            }
        }
        handled
    }

    /// Drives the controller until a handle requests shutdown.
    pub async fn run(mut self) {
        info!("PlaybackController: event loop started");
        while let Some(event) = self.events_rx.recv().await {
            if !self.handle_event(event) {
                break;
            }
        }
        info!("PlaybackController: event loop finished");
    }

    /// Returns false when the event asked the controller to shut down.
    pub(crate) fn handle_event(&mut self, event: ControllerEvent) -> bool {
        match event {
            ControllerEvent::Engine { session, event } => {
                if self.session.as_ref().map(|s| s.id) != Some(session) {
                    trace!("PlaybackController: dropping {:?} from retired session {:?}", event, session);
                    return true;
                }
                match event {
                    EngineEvent::Tick => self.on_tick(),
                    EngineEvent::ReachedEnd => self.on_reached_end(),
                }
            }
            ControllerEvent::Interruption(interruption) => self.on_interruption(interruption),
            ControllerEvent::Remote { command, reply } => {
                let status = self.on_remote_command(command);
                if let Some(reply) = reply {
                    let _ = reply.send(status);
                }
            }
            ControllerEvent::Command { command: Command::Shutdown, reply } => {
                self.stop();
                let _ = reply.send(Ok(()));
                return false;
            }
            ControllerEvent::Command { command, reply } => {
                let _ = reply.send(self.execute(command));
            }
        }
        true
    }

    fn execute(&mut self, command: Command) -> Result<(), PlaybackError> {
        match command {
            Command::Play { episode, feed } => self.play(episode, feed),
            Command::TogglePlayPause => self.toggle_play_pause(),
            Command::SkipToNext => self.skip_to_next(),
            Command::Seek(fraction) => self.seek(fraction),
            Command::Stop => {
                self.stop();
                Ok(())
            }
            Command::UpdateFeed(feed) => {
                self.update_feed(feed);
                Ok(())
            }
            Command::Shutdown => {
                self.stop();
                Ok(())
            }
        }
    }

    /// Holds the last value when the engine cannot report a usable duration.
    fn on_tick(&mut self) {
        let Some(progress) = self.session.as_ref().and_then(|s| engine_progress(&s.player)) else {
            return;
        };
        if progress != self.progress {
            self.progress = progress;
            self.publish();
        }
    }

    fn on_reached_end(&mut self) {
        if let Some(episode) = &self.current_episode {
            info!("PlaybackController: '{}' finished", episode.title());
        }
        self.phase = PlaybackPhase::Ended;
        if let Err(e) = self.skip_to_next() {
            warn!("PlaybackController: auto-advance failed: {}", e);
        }
    }

    fn on_interruption(&mut self, interruption: Interruption) {
        match interruption {
            Interruption::Began => {
                if self.is_playing && self.set_playing(false).is_ok() {
                    info!("PlaybackController: interrupted, pausing");
                    self.resume_after_interruption = true;
                    self.publish();
                }
            }
            Interruption::Ended { should_resume } => {
                let resume = should_resume && self.resume_after_interruption;
                self.resume_after_interruption = false;
                if resume && self.set_playing(true).is_ok() {
                    info!("PlaybackController: interruption over, resuming");
                    self.publish();
                }
            }
            Interruption::Other => debug!("PlaybackController: ignoring unrecognised interruption"),
        }
    }

    fn on_remote_command(&mut self, command: RemoteCommand) -> CommandStatus {
        debug!("PlaybackController: remote {:?}", command);
        let succeeded = match command {
            RemoteCommand::Play => !self.is_playing && self.set_playing(true).is_ok(),
            RemoteCommand::Pause => self.is_playing && self.set_playing(false).is_ok(),
            RemoteCommand::NextTrack => {
                if let Err(e) = self.skip_to_next() {
                    warn!("PlaybackController: remote next-track: {}", e);
                }
                true
            }
        };
        if !succeeded {
            return CommandStatus::CommandFailed;
        }
        if command != RemoteCommand::NextTrack {
            self.resume_after_interruption = false;
            self.publish();
        }
        CommandStatus::Success
    }

    // ==================================== Internals ===========================================

    fn sink(&self, id: SessionId) -> EventSink {
        EventSink::new(id, self.events_tx.clone())
    }

    /// Engine and flag change together; callers publish afterwards.
    fn set_playing(&mut self, playing: bool) -> Result<(), PlaybackError> {
        let session = self.session.as_mut().ok_or(PlaybackError::NoActiveSession)?;
        if playing {
            session.player.play();
            self.phase = PlaybackPhase::Playing;
        } else {
            session.player.pause();
            self.phase = PlaybackPhase::Paused;
        }
        self.is_playing = playing;
        Ok(())
    }

    fn teardown_session(&mut self) -> bool {
        match self.session.take() {
            Some(session) => {
                trace!("PlaybackController: releasing session {:?}", session.id);
                session.release();
                true
            }
            None => false,
        }
    }

    fn clear_playback_state(&mut self) {
        self.current_episode = None;
        self.is_playing = false;
        self.progress = 0.0;
        self.resume_after_interruption = false;
    }
}

impl<E: MediaEngine> Drop for PlaybackController<E> {
    fn drop(&mut self) {
        if self.teardown_session() {
            debug!("PlaybackController: dropped with a live session, released it");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::playback::testing::{FakeEngine, episode, feed_of};

    fn controller() -> (PlaybackController<FakeEngine>, FakeEngine) {
        init_test_logging();
        let engine = FakeEngine::default();
        let controller = PlaybackController::new(engine.clone()).with_rng(StdRng::seed_from_u64(7));
        (controller, engine)
    }

    struct FakeRemote {
        target: Option<RemoteTarget>,
    }

    impl RemoteCommandSurface for FakeRemote {
        fn register(&mut self, target: RemoteTarget) {
            self.target = Some(target);
        }
    }

    struct FakeAudioSession {
        sink: Option<InterruptionSink>,
    }

    impl InterruptionSource for FakeAudioSession {
        fn register(&mut self, sink: InterruptionSink) {
            self.sink = Some(sink);
        }
    }

    #[test]
    fn test_play_starts_session() {
        let (mut controller, engine) = controller();
        let feed = feed_of(3);
        controller.play(feed.episodes()[1].clone(), feed.clone()).unwrap();

        assert_eq!(controller.phase(), PlaybackPhase::Playing);
        assert!(controller.is_playing());
        assert_eq!(controller.current_episode(), Some(&feed.episodes()[1]));
        assert_eq!(controller.selected_feed().map(Feed::id), Some(feed.id()));
        assert_eq!(engine.live_players(), 1);
        assert!(engine.log().playing);
        assert_eq!(engine.log().observers.len(), 2);
    }

    #[test]
    fn test_replacing_a_session_leaves_one_live_player() {
        let (mut controller, engine) = controller();
        let feed = feed_of(2);
        let (e1, e2) = (feed.episodes()[0].clone(), feed.episodes()[1].clone());

        controller.play(e1, feed.clone()).unwrap();
        controller.play(e2.clone(), feed.clone()).unwrap();

        assert_eq!(engine.live_players(), 1);
        assert_eq!(engine.log().observers.len(), 2);
        assert_eq!(controller.current_episode(), Some(&e2));

        // Late callbacks from the first session change nothing.
        engine.set_media(Duration::from_secs(50), Some(Duration::from_secs(100)));
        engine.fire_retired();
        assert_eq!(controller.process_pending(), 2);
        assert_eq!(controller.current_episode(), Some(&e2));
        assert_eq!(controller.progress(), 0.0);
        assert_eq!(engine.log().loaded.len(), 2);
    }

    #[test]
    fn test_teardown_order() {
        let (mut controller, engine) = controller();
        let feed = feed_of(2);
        controller.play(feed.episodes()[0].clone(), feed.clone()).unwrap();
        engine.log().calls.clear();

        controller.play(feed.episodes()[1].clone(), feed.clone()).unwrap();

        let calls = engine.log().calls.clone();
        assert_eq!(
            calls,
            vec![
                "pause".to_string(),
                "remove Tick".to_string(),
                "remove End".to_string(),
                "release".to_string(),
                "load https://cdn.example.com/1.mp3".to_string(),
                "observe Tick".to_string(),
                "observe End".to_string(),
                "play".to_string(),
            ]
        );
    }

    #[test]
    fn test_toggle_without_session_reports_and_changes_nothing() {
        let (mut controller, _engine) = controller();
        let before = controller.snapshot();
        assert_eq!(controller.toggle_play_pause(), Err(PlaybackError::NoActiveSession));
        assert_eq!(controller.snapshot(), before);
    }

    #[test]
    fn test_toggle_flips_engine_and_flag() {
        let (mut controller, engine) = controller();
        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();

        controller.toggle_play_pause().unwrap();
        assert!(!controller.is_playing());
        assert_eq!(controller.phase(), PlaybackPhase::Paused);
        assert!(!engine.log().playing);

        controller.toggle_play_pause().unwrap();
        assert!(controller.is_playing());
        assert_eq!(controller.phase(), PlaybackPhase::Playing);
        assert!(engine.log().playing);
    }

    #[test]
    fn test_skip_on_single_episode_feed_always_picks_it() {
        let (mut controller, _engine) = controller();
        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed.clone()).unwrap();
        for _ in 0..20 {
            controller.skip_to_next().unwrap();
            assert_eq!(controller.current_episode(), Some(&feed.episodes()[0]));
        }
    }

    #[test]
    fn test_skip_covers_the_feed_with_repeats() {
        let (mut controller, engine) = controller();
        let feed = feed_of(3);
        controller.play(feed.episodes()[0].clone(), feed.clone()).unwrap();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..60 {
            controller.skip_to_next().unwrap();
            seen.insert(controller.current_episode().unwrap().id());
        }
        assert_eq!(seen.len(), 3);
        assert_eq!(engine.live_players(), 1);
    }

    #[test]
    fn test_skip_on_empty_feed_settles_idle() {
        let (mut controller, engine) = controller();
        let empty = feed_of(0);
        controller.play(episode(9), empty.clone()).unwrap();

        assert_eq!(controller.skip_to_next(), Err(PlaybackError::EmptyFeed));
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
        assert!(controller.current_episode().is_none());
        assert!(!controller.is_playing());
        assert_eq!(engine.live_players(), 0);
    }

    #[test]
    fn test_skip_without_feed() {
        let (mut controller, _engine) = controller();
        assert_eq!(controller.skip_to_next(), Err(PlaybackError::NoFeedSelected));
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
    }

    #[test]
    fn test_seek_clamps_fraction() {
        let (mut controller, engine) = controller();
        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();
        let total = Duration::from_secs(200);
        engine.set_media(Duration::ZERO, Some(total));

        controller.seek(1.0).unwrap();
        let at_one = (engine.log().last_seek, controller.progress());
        controller.seek(0.3).unwrap();
        controller.seek(1.5).unwrap();
        assert_eq!((engine.log().last_seek, controller.progress()), at_one);
        assert_eq!(at_one, (Some(total), 1.0));

        controller.seek(-2.0).unwrap();
        assert_eq!(engine.log().last_seek, Some(Duration::ZERO));
        controller.seek(f64::NAN).unwrap();
        assert_eq!(engine.log().last_seek, Some(Duration::ZERO));

        controller.seek(0.5).unwrap();
        assert_eq!(engine.log().last_seek, Some(Duration::from_secs(100)));
        assert_eq!(controller.progress(), 0.5);
    }

    #[test]
    fn test_seek_without_session_or_duration() {
        let (mut controller, engine) = controller();
        assert_eq!(controller.seek(0.5), Err(PlaybackError::NoActiveSession));

        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();
        engine.set_media(Duration::ZERO, None);
        controller.seek(0.5).unwrap();
        assert_eq!(engine.log().last_seek, None);
    }

    #[test]
    fn test_tick_recomputes_progress() {
        let (mut controller, engine) = controller();
        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();

        engine.set_media(Duration::from_secs(30), Some(Duration::from_secs(120)));
        engine.fire_tick();
        controller.process_pending();
        assert_eq!(controller.progress(), 0.25);

        // Unknown or zero duration: hold the last value.
        engine.set_media(Duration::from_secs(90), None);
        engine.fire_tick();
        controller.process_pending();
        assert_eq!(controller.progress(), 0.25);

        engine.set_media(Duration::from_secs(90), Some(Duration::ZERO));
        engine.fire_tick();
        controller.process_pending();
        assert_eq!(controller.progress(), 0.25);
    }

    #[test]
    fn test_reached_end_matches_explicit_skip() {
        let feed = feed_of(5);
        let start = feed.episodes()[0].clone();

        let (mut skipped, _skipped_engine) = controller();
        skipped.play(start.clone(), feed.clone()).unwrap();
        skipped.skip_to_next().unwrap();

        let (mut ended, ended_engine) = controller();
        ended.play(start, feed.clone()).unwrap();
        ended_engine.set_media(Duration::from_secs(60), Some(Duration::from_secs(60)));
        ended_engine.fire_tick();
        ended.process_pending();
        assert_eq!(ended.progress(), 1.0);

        ended_engine.fire_reached_end();
        ended.process_pending();

        assert_eq!(ended.snapshot(), skipped.snapshot());
        assert_eq!(ended.progress(), 0.0);
        assert!(ended.is_playing());
        assert_eq!(ended_engine.live_players(), 1);
    }

    #[test]
    fn test_interruption_pauses_and_resumes() {
        let (mut controller, engine) = controller();
        let mut audio_session = FakeAudioSession { sink: None };
        controller.connect_interruptions(&mut audio_session);
        let sink = audio_session.sink.unwrap();

        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();
        engine.set_media(Duration::from_secs(40), Some(Duration::from_secs(100)));
        engine.fire_tick();
        controller.process_pending();

        sink.notify(Interruption::Began);
        controller.process_pending();
        assert!(!controller.is_playing());
        assert!(controller.has_session());
        assert!(!engine.log().playing);

        sink.notify(Interruption::Other);
        sink.notify(Interruption::Ended { should_resume: true });
        controller.process_pending();
        assert!(controller.is_playing());
        assert!(engine.log().playing);
        assert_eq!(controller.progress(), 0.4);
    }

    #[test]
    fn test_interruption_without_resume_hint_stays_paused() {
        let (mut controller, _engine) = controller();
        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();

        controller.handle_event(ControllerEvent::Interruption(Interruption::Began));
        controller.handle_event(ControllerEvent::Interruption(Interruption::Ended { should_resume: false }));
        assert!(!controller.is_playing());
        assert_eq!(controller.phase(), PlaybackPhase::Paused);
    }

    #[test]
    fn test_interruption_does_not_resume_user_pause() {
        let (mut controller, _engine) = controller();
        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();
        controller.toggle_play_pause().unwrap();

        controller.handle_event(ControllerEvent::Interruption(Interruption::Began));
        controller.handle_event(ControllerEvent::Interruption(Interruption::Ended { should_resume: true }));
        assert!(!controller.is_playing());
    }

    #[test]
    fn test_remote_commands_report_status() {
        let (mut controller, _engine) = controller();
        let mut remote = FakeRemote { target: None };
        controller.connect_remote(&mut remote);
        let target = remote.target.unwrap();

        let send = |controller: &mut PlaybackController<FakeEngine>, command: RemoteCommand| {
            let mut rx = target.dispatch(command);
            controller.process_pending();
            rx.try_recv().unwrap()
        };

        // Nothing loaded yet.
        assert_eq!(send(&mut controller, RemoteCommand::Play), CommandStatus::CommandFailed);
        assert_eq!(send(&mut controller, RemoteCommand::Pause), CommandStatus::CommandFailed);
        assert_eq!(send(&mut controller, RemoteCommand::NextTrack), CommandStatus::Success);

        let feed = feed_of(2);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();
        assert_eq!(send(&mut controller, RemoteCommand::Play), CommandStatus::CommandFailed);
        assert_eq!(send(&mut controller, RemoteCommand::Pause), CommandStatus::Success);
        assert!(!controller.is_playing());
        assert_eq!(send(&mut controller, RemoteCommand::Pause), CommandStatus::CommandFailed);
        assert_eq!(send(&mut controller, RemoteCommand::Play), CommandStatus::Success);
        assert!(controller.is_playing());

        let before = controller.current_episode().cloned();
        assert_eq!(send(&mut controller, RemoteCommand::NextTrack), CommandStatus::Success);
        assert!(controller.is_playing());
        assert!(before.is_some());
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut controller, engine) = controller();
        controller.stop();

        let feed = feed_of(2);
        controller.play(feed.episodes()[0].clone(), feed.clone()).unwrap();
        engine.set_media(Duration::from_secs(10), Some(Duration::from_secs(20)));
        engine.fire_tick();
        controller.process_pending();

        controller.stop();
        controller.stop();
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
        assert!(controller.current_episode().is_none());
        assert!(!controller.is_playing());
        assert_eq!(controller.progress(), 0.0);
        assert_eq!(engine.live_players(), 0);
        assert!(engine.log().observers.is_empty());

        // The feed stays selected so shuffling can pick up again.
        controller.skip_to_next().unwrap();
        assert!(controller.is_playing());
    }

    #[test]
    fn test_engine_load_failure() {
        let (mut controller, engine) = controller();
        engine.log().fail_loads = true;
        let feed = feed_of(1);

        let result = controller.play(feed.episodes()[0].clone(), feed);
        assert!(matches!(result, Err(PlaybackError::EngineInitFailure(_))));
        assert_eq!(controller.phase(), PlaybackPhase::Idle);
        assert!(!controller.is_playing());
        assert!(controller.current_episode().is_none());
        assert_eq!(engine.live_players(), 0);
    }

    /// Records what subscribers can see at the moment the engine is asked to load.
    struct SnapshotAtLoadEngine {
        inner: FakeEngine,
        updates: Option<watch::Receiver<PlaybackSnapshot>>,
        seen: Vec<PlaybackSnapshot>,
    }

    impl MediaEngine for SnapshotAtLoadEngine {
        type Player = <FakeEngine as MediaEngine>::Player;

        fn load(&mut self, uri: &url::Url) -> Result<Self::Player, crate::playback::engine::EngineError> {
            if let Some(updates) = &self.updates {
                self.seen.push(updates.borrow().clone());
            }
            self.inner.load(uri)
        }
    }

    #[test]
    fn test_loading_is_published_before_engine_load() {
        init_test_logging();
        let engine = SnapshotAtLoadEngine { inner: FakeEngine::default(), updates: None, seen: Vec::new() };
        let mut controller = PlaybackController::new(engine).with_rng(StdRng::seed_from_u64(7));
        controller.engine.updates = Some(controller.subscribe());

        let feed = feed_of(2);
        controller.play(feed.episodes()[1].clone(), feed.clone()).unwrap();

        let at_load = &controller.engine.seen[0];
        assert_eq!(at_load.phase, PlaybackPhase::Loading);
        assert_eq!(at_load.feed_id, Some(feed.id()));
        assert_eq!(at_load.episode.as_ref(), feed.episodes().get(1));
        assert!(!at_load.is_playing);
        assert_eq!(controller.phase(), PlaybackPhase::Playing);
    }

    #[test]
    fn test_drop_releases_session() {
        let (mut controller, engine) = controller();
        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();
        drop(controller);
        assert_eq!(engine.live_players(), 0);
        assert!(engine.log().observers.is_empty());
    }

    #[test]
    fn test_subscribers_see_whole_snapshots() {
        let (mut controller, _engine) = controller();
        let mut rx = controller.subscribe();
        assert!(!rx.has_changed().unwrap());

        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed.clone()).unwrap();
        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert_eq!(snapshot.phase, PlaybackPhase::Playing);
        assert_eq!(snapshot.feed_name.as_deref(), Some("Show"));
        assert_eq!(snapshot.episode.as_ref(), feed.episodes().first());
        assert!(snapshot.is_playing);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["phase"], "Playing");
        assert_eq!(json["episode"]["title"], "Episode 0");
    }

    #[test]
    fn test_tick_interval_from_config() {
        init_test_logging();
        let engine = FakeEngine::default();
        let config = ClientConfig::from_json_str(r#"{"tick_interval_ms": 250}"#).unwrap();
        let mut controller = PlaybackController::from_config(engine.clone(), &config);
        let feed = feed_of(1);
        controller.play(feed.episodes()[0].clone(), feed).unwrap();
        assert_eq!(engine.log().tick_interval, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_update_feed_only_touches_selected_feed() {
        let (mut controller, _engine) = controller();
        let feed = feed_of(0);
        controller.play(episode(1), feed.clone()).unwrap();

        controller.update_feed(feed_of(3));
        assert!(controller.selected_feed().unwrap().episodes().is_empty());

        let mut refreshed = feed.clone();
        refreshed.replace_episodes(vec![episode(4)]);
        controller.update_feed(refreshed);
        controller.skip_to_next().unwrap();
        assert_eq!(controller.current_episode().map(Episode::title), Some("Episode 4"));
    }
}
