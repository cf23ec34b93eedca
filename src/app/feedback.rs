use eframe::egui::Pos2;

const GROWTH_PER_SECOND: f32 = 240.0;
const MAX_RADIUS: f32 = 70.0;
const MAX_ALPHA: f32 = 0.6;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(in crate::app) struct Pulse {
    pub center: Pos2,
    pub radius: f32,
    pub alpha: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) struct AnimationToken(u64);

struct ActivePulse {
    token: AnimationToken,
    center: Pos2,
    started_at: f64,
}

/// Click feedback ring. At most one pulse runs; starting a new one replaces the old one.
#[derive(Default)]
pub(in crate::app) struct FeedbackAnimator {
    next_token: u64,
    active: Option<ActivePulse>,
}

impl FeedbackAnimator {
    pub(in crate::app) fn start(&mut self, center: Pos2, now: f64) -> AnimationToken {
        self.next_token += 1;
        let token = AnimationToken(self.next_token);
        self.active = Some(ActivePulse {
            token,
            center,
            started_at: now,
        });
        token
    }

    /// Stops the pulse identified by `token`; stale tokens are ignored.
    pub(in crate::app) fn cancel(&mut self, token: AnimationToken) {
        if self.active.as_ref().is_some_and(|pulse| pulse.token == token) {
            self.active = None;
        }
    }

    /// The ring to paint at `now`, or `None` once it has fully expanded.
    pub(in crate::app) fn frame(&mut self, now: f64) -> Option<Pulse> {
        let pulse = self.active.as_ref()?;
        let elapsed = (now - pulse.started_at).max(0.0) as f32;
        let radius = elapsed * GROWTH_PER_SECOND;
        if radius >= MAX_RADIUS {
            self.active = None;
            return None;
        }

        Some(Pulse {
            center: pulse.center,
            radius,
            alpha: (1.0 - radius / MAX_RADIUS) * MAX_ALPHA,
        })
    }
}

#[cfg(test)]
mod tests {
    use eframe::egui::pos2;

    use super::*;

    #[test]
    fn pulse_grows_fades_and_retires() {
        let mut animator = FeedbackAnimator::default();
        animator.start(pos2(100.0, 100.0), 10.0);

        let first = animator.frame(10.0).expect("running");
        assert_eq!(first.radius, 0.0);
        assert!((first.alpha - 0.6).abs() < 1e-6);

        let middle = animator.frame(10.125).expect("running");
        assert!((middle.radius - 30.0).abs() < 1e-3);
        assert!(middle.alpha < first.alpha);

        assert_eq!(animator.frame(10.5), None);
        assert_eq!(animator.frame(10.6), None);
    }

    #[test]
    fn a_new_pulse_replaces_the_old_one() {
        let mut animator = FeedbackAnimator::default();
        let old = animator.start(pos2(10.0, 10.0), 0.0);
        let new = animator.start(pos2(50.0, 60.0), 0.1);
        assert_ne!(old, new);

        animator.cancel(old);
        let pulse = animator.frame(0.1).expect("newer pulse survives a stale cancel");
        assert_eq!(pulse.center, pos2(50.0, 60.0));

        animator.cancel(new);
        assert_eq!(animator.frame(0.2), None);
    }
}
