// Integration tests for the fallback announcer's channel priority

mod common;

use common::{RecordingPlayer, RecordingSpeech};
use std::sync::Arc;
use voice_agent::{
    Announcement, AudioPlayer, AudioRef, FallbackAnnouncer, LocalSpeech, SurfaceSnapshot, UiSurface,
};

const NOTICE: &str = "I'm having trouble responding right now.";

#[tokio::test]
async fn test_local_speech_is_tried_first() {
    let surface = SurfaceSnapshot::new();
    let speech = Arc::new(RecordingSpeech::default());
    let mut ui = surface.surface();
    ui.speech = Some(speech.clone() as Arc<dyn LocalSpeech>);

    let announcer = FallbackAnnouncer::new(&ui);

    assert_eq!(announcer.announce(NOTICE).await, Announcement::Spoken);
    assert_eq!(speech.spoken(), vec![NOTICE.to_string()]);
    assert_eq!(surface.recording_status.text(), None);
}

#[tokio::test]
async fn test_failed_speech_falls_back_to_status() {
    let surface = SurfaceSnapshot::new();
    let speech = Arc::new(RecordingSpeech {
        fail: true,
        ..Default::default()
    });
    let mut ui = surface.surface();
    ui.speech = Some(speech.clone() as Arc<dyn LocalSpeech>);

    let announcer = FallbackAnnouncer::new(&ui);

    assert_eq!(announcer.announce(NOTICE).await, Announcement::Displayed);
    assert_eq!(speech.spoken().len(), 1);
    assert_eq!(surface.recording_status.text().as_deref(), Some(NOTICE));
}

#[tokio::test]
async fn test_general_status_used_without_recording_status() {
    let surface = SurfaceSnapshot::new();
    let mut ui = surface.surface();
    ui.recording_status = None;

    let announcer = FallbackAnnouncer::new(&ui);

    assert_eq!(announcer.announce(NOTICE).await, Announcement::Displayed);
    assert_eq!(surface.status.text().as_deref(), Some(NOTICE));
}

#[tokio::test]
async fn test_cached_audio_when_nothing_else_is_available() {
    let player = Arc::new(RecordingPlayer::default());
    let ui = UiSurface {
        player: Some(player.clone() as Arc<dyn AudioPlayer>),
        ..Default::default()
    };

    let announcer = FallbackAnnouncer::new(&ui);
    assert_eq!(announcer.announce(NOTICE).await, Announcement::Silent);

    announcer.remember_fallback(AudioRef::new("/static/fallback.mp3"));
    assert_eq!(announcer.announce(NOTICE).await, Announcement::CachedAudio);
    assert_eq!(player.played(), vec!["/static/fallback.mp3".to_string()]);
}

#[tokio::test]
async fn test_no_channels_is_silent_not_an_error() {
    let announcer = FallbackAnnouncer::new(&UiSurface::default());
    announcer.remember_fallback(AudioRef::new("/static/fallback.mp3"));

    assert_eq!(announcer.announce(NOTICE).await, Announcement::Silent);
}
