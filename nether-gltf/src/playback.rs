//! Playback clock driving an animation clip.

use crate::animation::AnimationClip;
use crate::document::Document;
use crate::error::{GltfError, Result};
use crate::pose::Pose;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Play/pause/seek state over one clip.
///
/// Time only moves in [`Playback::advance`], and only while playing. A
/// non-looping clip that runs off either end stops there.
#[derive(Debug, Clone)]
pub struct Playback {
    clip: AnimationClip,
    state: PlaybackState,
    time: f32,
    speed: f32,
    looping: bool,
}

impl Playback {
    pub fn new(document: &Document, animation: usize) -> Result<Self> {
        Ok(Self::from_clip(AnimationClip::new(document, animation)?))
    }

    pub fn from_clip(clip: AnimationClip) -> Self {
        Self {
            clip,
            state: PlaybackState::Stopped,
            time: 0.0,
            speed: 1.0,
            looping: false,
        }
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Current time in seconds.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn duration(&self) -> f32 {
        self.clip.duration()
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn set_speed(&mut self, speed: f32) -> Result<()> {
        if !speed.is_finite() {
            return Err(GltfError::validation("speed", format!("is {}, expected a finite value", speed)));
        }
        self.speed = speed;
        Ok(())
    }

    pub fn looping(&self) -> bool {
        self.looping
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.looping = looping;
    }

    /// Start or resume. A finished clip starts over.
    pub fn play(&mut self) {
        let at_end = if self.speed >= 0.0 {
            self.time >= self.duration()
        } else {
            self.time <= 0.0
        };
        if self.state == PlaybackState::Stopped && at_end && self.duration() > 0.0 {
            self.time = if self.speed >= 0.0 { 0.0 } else { self.duration() };
        }
        self.state = PlaybackState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state == PlaybackState::Playing {
            self.state = PlaybackState::Paused;
        }
    }

    /// Stop and rewind to the start.
    pub fn stop(&mut self) {
        self.state = PlaybackState::Stopped;
        self.time = 0.0;
    }

    /// Rewind and play.
    pub fn restart(&mut self) {
        self.time = 0.0;
        self.state = PlaybackState::Playing;
    }

    /// Jump to `time` seconds, clamped to the clip (wrapped when looping).
    pub fn seek(&mut self, time: f32) -> Result<()> {
        self.time = self.clip.local_time(time, self.looping)?;
        Ok(())
    }

    /// Jump to a fraction of the duration; `percent` is in 0..=100.
    pub fn seek_percent(&mut self, percent: f32) -> Result<()> {
        let percent = percent.clamp(0.0, 100.0);
        self.seek(self.duration() * percent / 100.0)
    }

    /// Move the clock by `dt` seconds scaled by speed. Returns the new time.
    pub fn advance(&mut self, dt: f32) -> f32 {
        if self.state != PlaybackState::Playing || !dt.is_finite() {
            return self.time;
        }
        let duration = self.duration();
        let next = self.time + dt * self.speed;

        if self.looping && duration > 0.0 {
            self.time = next.rem_euclid(duration);
        } else if next >= duration {
            self.time = duration;
            self.state = PlaybackState::Stopped;
            tracing::debug!("Playback of '{}' finished", self.clip.name().unwrap_or("unnamed"));
        } else if next <= 0.0 && self.speed < 0.0 {
            self.time = 0.0;
            self.state = PlaybackState::Stopped;
        } else {
            self.time = next.max(0.0);
        }
        self.time
    }

    /// Pose at the current time.
    pub fn pose(&self, document: &Document) -> Result<Pose> {
        self.clip.pose_at(document, self.time, self.looping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{ClipChannel, Keyframes};
    use crate::document::{Interpolation, Property};

    fn two_second_clip() -> Playback {
        let keyframes = Keyframes::new(
            vec![0.0, 2.0],
            vec![0.0, 0.0, 0.0, 2.0, 0.0, 0.0],
            3,
            Interpolation::Linear,
        )
        .unwrap();
        Playback::from_clip(AnimationClip::from_channels(
            Some("slide".into()),
            vec![ClipChannel {
                node: 0,
                property: Property::Translation,
                keyframes,
            }],
        ))
    }

    #[test]
    fn test_advance_only_while_playing() {
        let mut playback = two_second_clip();
        assert_eq!(playback.advance(0.5), 0.0);
        playback.play();
        assert_eq!(playback.advance(0.5), 0.5);
        playback.pause();
        assert_eq!(playback.advance(0.5), 0.5);
        assert_eq!(playback.state(), PlaybackState::Paused);
    }

    #[test]
    fn test_finishes_at_end() {
        let mut playback = two_second_clip();
        playback.play();
        assert_eq!(playback.advance(5.0), 2.0);
        assert_eq!(playback.state(), PlaybackState::Stopped);
        // Playing again starts over
        playback.play();
        assert_eq!(playback.time(), 0.0);
    }

    #[test]
    fn test_looping_wraps() {
        let mut playback = two_second_clip();
        playback.set_looping(true);
        playback.play();
        assert_eq!(playback.advance(2.5), 0.5);
        assert!(playback.is_playing());
    }

    #[test]
    fn test_speed_and_reverse() {
        let mut playback = two_second_clip();
        playback.set_speed(2.0).unwrap();
        playback.play();
        assert_eq!(playback.advance(0.5), 1.0);
        playback.set_speed(-1.0).unwrap();
        assert_eq!(playback.advance(0.25), 0.75);
        assert_eq!(playback.advance(1.0), 0.0);
        assert_eq!(playback.state(), PlaybackState::Stopped);
        assert!(playback.set_speed(f32::INFINITY).is_err());
    }

    #[test]
    fn test_seek_and_stop() {
        let mut playback = two_second_clip();
        playback.seek(9.0).unwrap();
        assert_eq!(playback.time(), 2.0);
        playback.seek_percent(25.0).unwrap();
        assert_eq!(playback.time(), 0.5);
        playback.restart();
        assert_eq!(playback.time(), 0.0);
        assert!(playback.is_playing());
        playback.advance(1.0);
        playback.stop();
        assert_eq!(playback.time(), 0.0);
        assert_eq!(playback.state(), PlaybackState::Stopped);
    }
}
