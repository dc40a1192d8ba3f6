//! Loading-screen orchestrator.
//!
//! Owns the content-set catalogs, the live transition instances, the logo
//! and the spawn timer, and reacts to the three host lifecycle signals:
//! load-started, device (re)mount, and frame-to-draw. GPU work triggered by
//! lifecycle signals is never run in place; it goes through the deferred
//! queue and executes at the top of the next drawn frame.

use crate::catalog::{CreateOutcome, GpuHandles, ResourceCatalog};
use crate::placed::{Anchor, PlacedTexture};
use crate::transition::{Side, Target, TransitionInstance};
use crate::work_queue::DeferredGpuWorkQueue;
use glam::Vec2;
use marquee_core::manifest::ContentSetDesc;
use marquee_core::math::lerp;
use marquee_core::role::Role;
use marquee_core::settings::Settings;
use marquee_render::DrawContext;
use rand::rngs::StdRng;
use rand::Rng;
use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

const BACKDROP_COLOR: [f32; 4] = [0.0, 0.0, 0.0, 1.0];
const LOGO_MARGIN: f32 = 10.0;

pub struct Orchestrator {
    settings: Settings,
    catalogs: Vec<Rc<RefCell<ResourceCatalog>>>,
    active: Option<Rc<RefCell<ResourceCatalog>>>,
    live: Vec<TransitionInstance>,
    logo: Option<PlacedTexture>,
    logo_alpha: f32,
    /// `None` until the first spawn: the timer never fires before then.
    next_switch_at: Option<Instant>,
    is_loading: bool,
    can_display: bool,
    queue: DeferredGpuWorkQueue,
    gpu: Option<GpuHandles>,
    rng: StdRng,
}

impl Orchestrator {
    pub fn new(
        settings: Settings,
        sets: &[ContentSetDesc],
        asset_root: &Path,
        rng: StdRng,
    ) -> Self {
        let catalogs = sets
            .iter()
            .map(|desc| Rc::new(RefCell::new(ResourceCatalog::new(desc, asset_root))))
            .collect::<Vec<_>>();
        if catalogs.is_empty() {
            log::warn!("No content-sets available; the loading overlay stays dormant");
        }
        Self {
            settings,
            catalogs,
            active: None,
            live: Vec::new(),
            logo: None,
            logo_alpha: 0.0,
            next_switch_at: None,
            is_loading: false,
            can_display: false,
            queue: DeferredGpuWorkQueue::new(),
            gpu: None,
            rng,
        }
    }

    pub fn content_set_ids(&self) -> Vec<u32> {
        self.catalogs
            .iter()
            .map(|c| c.borrow().content_set_id())
            .collect()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    /// The device (and its queue/pipeline) is available. Logos for every
    /// content-set are preloaded eagerly so the fade-in never waits on a
    /// texture upload mid-load.
    pub fn on_device_mount(&mut self, gpu: GpuHandles) {
        self.gpu = Some(gpu.clone());
        for catalog in &self.catalogs {
            let catalog = Rc::clone(catalog);
            let gpu = gpu.clone();
            self.queue.push(move || {
                let mut catalog = catalog.borrow_mut();
                if let Err(e) = catalog.discover_files() {
                    log::warn!("{e}");
                    return;
                }
                catalog.create_of_role(&gpu, Role::Logo);
                if catalog.is_empty() {
                    log::debug!(
                        "Content-set {} has no logo textures",
                        catalog.content_set_id()
                    );
                }
            });
        }
        log::info!(
            "Device mounted; logo preload queued for {} content-sets",
            self.catalogs.len()
        );
    }

    /// The device is going away. Everything created against it must be
    /// dropped, and drawing stops until a new mount plus load-start.
    pub fn on_device_remount(&mut self) {
        self.live.clear();
        self.logo = None;
        self.logo_alpha = 0.0;
        self.next_switch_at = None;
        self.is_loading = false;
        self.can_display = false;
        self.active = None;
        self.gpu = None;
        for catalog in &self.catalogs {
            let catalog = Rc::clone(catalog);
            self.queue.push(move || {
                catalog.borrow_mut().release_of_role(None);
            });
        }
        log::info!("Device remount: loading state reset, texture release queued");
    }

    /// The host started a blocking load for the given content-set. State
    /// flips synchronously; discovery, creation and the first spawn happen
    /// on the draw context once the queue drains.
    pub fn on_load_start(&mut self, content_set_id: u32) {
        let Some(catalog) = self
            .catalogs
            .iter()
            .find(|c| c.borrow().content_set_id() == content_set_id)
            .cloned()
        else {
            log::warn!("Load started for unknown content-set {content_set_id}, staying dormant");
            return;
        };

        // Switching sets tears the previous set's screen textures down first.
        if let Some(previous) = self.active.take() {
            if !Rc::ptr_eq(&previous, &catalog) {
                self.queue.push(move || {
                    let mut previous = previous.borrow_mut();
                    previous.release_of_role(Some(Role::Background));
                    previous.release_of_role(Some(Role::Character));
                });
            }
        }

        self.active = Some(Rc::clone(&catalog));
        self.live.clear();
        self.logo = None;
        self.logo_alpha = 0.0;
        self.next_switch_at = None;
        self.is_loading = true;
        self.can_display = false;
        log::info!("Loading started for content-set {content_set_id}");

        let Some(gpu) = self.gpu.clone() else {
            log::warn!("Load started before the device was mounted; textures not created");
            return;
        };
        self.queue.push(move || {
            let mut catalog = catalog.borrow_mut();
            if let Err(e) = catalog.discover_files() {
                log::warn!("{e}");
            }
            match catalog.create_all(&gpu) {
                CreateOutcome::Created(_) => catalog.attach_background_configs(),
                CreateOutcome::AlreadyCreated => {}
                CreateOutcome::InProgress => log::warn!(
                    "Texture creation already in progress for content-set {}",
                    catalog.content_set_id()
                ),
            }
        });
    }

    /// One drawn frame: drain deferred work, then backdrop, transitions and
    /// logo. Does nothing while no load is in progress.
    pub fn on_draw_frame(&mut self, ctx: &mut DrawContext, viewport: Vec2) {
        if !self.queue.is_empty() {
            log::trace!("Draining {} deferred GPU work items", self.queue.len());
        }
        self.queue.drain();
        if !self.is_loading {
            return;
        }

        ctx.add_rect_filled(Vec2::ZERO, viewport, BACKDROP_COLOR);

        // The first spawn retries until both roles have at least one entry
        // (creation may still be in flight on the queue).
        if !self.can_display {
            let ready = self.active.as_ref().is_some_and(|c| {
                let c = c.borrow();
                c.has_role(Role::Background) && c.has_role(Role::Character)
            });
            if ready && self.spawn_next(viewport, None) {
                self.can_display = true;
                log::info!("First transition spawned, overlay visible");
            }
        }
        if !self.can_display {
            return;
        }

        if let Some(due) = self.next_switch_at {
            if Instant::now() >= due {
                self.spawn_next(viewport, None);
            }
        }

        let set_scale = self
            .active
            .as_ref()
            .map(|c| c.borrow().character_scale())
            .unwrap_or(Vec2::ONE);
        let settings = self.settings.clone();
        self.live.retain_mut(|instance| {
            let finished = instance.advance(viewport, &settings, set_scale);
            if !finished {
                instance.draw(ctx);
            }
            !finished
        });

        if self.settings.show_logo {
            self.update_logo(ctx, viewport);
        }
    }

    /// Spawn one transition: random background + character from the active
    /// catalog, entering from `forced` or a random side. The first live
    /// instance (if any) is sent out the opposite side, so incoming and
    /// outgoing motion is always opposed. Returns `false` when either role
    /// is still empty.
    pub fn spawn_next(&mut self, viewport: Vec2, forced: Option<Side>) -> bool {
        let Some(catalog) = self.active.clone() else {
            return false;
        };
        let picked = {
            let catalog = catalog.borrow();
            let background = catalog.random_of_role(Role::Background, &mut self.rng);
            let character = catalog.random_of_role(Role::Character, &mut self.rng);
            match (background, character) {
                (Some(bg), Some(ch)) => {
                    Some((Rc::clone(&bg.handle), bg.offsets, Rc::clone(&ch.handle)))
                }
                _ => None,
            }
        };
        let Some((bg_handle, bg_offsets, char_handle)) = picked else {
            return false;
        };

        let side = forced.unwrap_or_else(|| {
            if self.rng.gen_bool(0.5) {
                Side::Left
            } else {
                Side::Right
            }
        });
        if let Some(first) = self.live.first_mut() {
            first.target = Target::from(side.opposite());
        }
        log::debug!(
            "Spawning transition from {:?}: '{}' + '{}'",
            side,
            bg_handle.borrow().file_name(),
            char_handle.borrow().file_name()
        );
        self.live.push(TransitionInstance::new(
            &bg_handle, bg_offsets, &char_handle, side, viewport,
        ));
        self.next_switch_at =
            Some(Instant::now() + Duration::from_secs_f64(self.settings.switch_interval_secs));
        true
    }

    fn update_logo(&mut self, ctx: &mut DrawContext, viewport: Vec2) {
        if self.logo.is_none() {
            if let Some(catalog) = &self.active {
                let catalog = catalog.borrow();
                if let Some(entry) = catalog.first_of_role(Role::Logo) {
                    self.logo = Some(PlacedTexture::new(&entry.handle, Anchor::TopLeft));
                }
            }
        }
        let fade = self.settings.logo_fade_speed;
        if let Some(logo) = self.logo.as_mut() {
            if let Some(size) = logo.texture_size() {
                logo.position = Vec2::new(LOGO_MARGIN, viewport.y - size.y - LOGO_MARGIN);
                self.logo_alpha = lerp(self.logo_alpha, 1.0, fade);
                logo.draw(ctx, [1.0, 1.0, 1.0, self.logo_alpha], false);
            }
        }
    }

    #[cfg(test)]
    fn catalogs(&self) -> &[Rc<RefCell<ResourceCatalog>>] {
        &self.catalogs
    }

    #[cfg(test)]
    fn live_mut(&mut self) -> &mut Vec<TransitionInstance> {
        &mut self.live
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn viewport() -> Vec2 {
        Vec2::new(1920.0, 1080.0)
    }

    fn descs(ids: &[u32]) -> Vec<ContentSetDesc> {
        ids.iter()
            .map(|&id| ContentSetDesc {
                content_set_id: id,
                resource_folder: format!("set{id}"),
                character_scale: Vec2::ONE,
            })
            .collect()
    }

    fn orchestrator_with_assets(ids: &[u32]) -> Orchestrator {
        let orch = Orchestrator::new(
            Settings::default(),
            &descs(ids),
            Path::new("/nonexistent"),
            StdRng::seed_from_u64(42),
        );
        for catalog in orch.catalogs() {
            let mut catalog = catalog.borrow_mut();
            catalog.insert_detached("town.bg.dds", 200, 100);
            catalog.insert_detached("hero.char.dds", 50, 150);
            catalog.insert_detached("chapter.logo.dds", 120, 40);
        }
        orch
    }

    #[test]
    fn stays_dormant_without_content_sets() {
        let mut orch = Orchestrator::new(
            Settings::default(),
            &[],
            Path::new("/nonexistent"),
            StdRng::seed_from_u64(1),
        );
        orch.on_load_start(0);
        assert!(!orch.is_loading());

        let mut ctx = DrawContext::new();
        orch.on_draw_frame(&mut ctx, viewport());
        assert!(ctx.is_empty());
    }

    #[test]
    fn unknown_content_set_id_is_ignored() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.on_load_start(99);
        assert!(!orch.is_loading());
    }

    #[test]
    fn first_frame_after_load_start_spawns_one_transition() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.on_load_start(0);
        assert!(orch.is_loading());
        assert_eq!(orch.live_count(), 0);

        let mut ctx = DrawContext::new();
        orch.on_draw_frame(&mut ctx, viewport());
        assert_eq!(orch.live_count(), 1);
        // At least the backdrop was emitted.
        assert!(!ctx.is_empty());
    }

    #[test]
    fn spawn_sends_the_first_live_instance_to_the_opposite_side() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.on_load_start(0);
        assert!(orch.spawn_next(viewport(), Some(Side::Left)));
        assert!(orch.spawn_next(viewport(), Some(Side::Right)));

        // Newcomer from the Right pushes the first instance out Left.
        assert_eq!(orch.live_mut()[0].target, Target::Left);
        assert_eq!(orch.live_mut()[1].target, Target::Center);

        assert!(orch.spawn_next(viewport(), Some(Side::Left)));
        assert_eq!(orch.live_mut()[0].target, Target::Right);
    }

    #[test]
    fn spawn_fails_while_a_role_is_empty() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.catalogs()[0]
            .borrow_mut()
            .release_of_role(Some(Role::Character));
        orch.on_load_start(0);

        assert!(!orch.spawn_next(viewport(), None));
        let mut ctx = DrawContext::new();
        orch.on_draw_frame(&mut ctx, viewport());
        assert_eq!(orch.live_count(), 0);
        assert!(orch.next_switch_at.is_none());
    }

    #[test]
    fn spawning_schedules_the_next_switch() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.on_load_start(0);
        assert!(orch.next_switch_at.is_none());

        assert!(orch.spawn_next(viewport(), Some(Side::Left)));
        let due = orch.next_switch_at.expect("timer armed after a spawn");
        assert!(due > Instant::now());
    }

    #[test]
    fn exited_instances_are_removed_during_the_frame() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.on_load_start(0);
        assert!(orch.spawn_next(viewport(), Some(Side::Left)));
        orch.can_display = true;

        // Park the instance right on its exit target.
        {
            let instance = &mut orch.live_mut()[0];
            instance.target = Target::Right;
            instance.background.position = Vec2::new(1920.0 + 200.0, 540.0);
        }
        let mut ctx = DrawContext::new();
        orch.on_draw_frame(&mut ctx, viewport());
        assert_eq!(orch.live_count(), 0);
    }

    #[test]
    fn logo_alpha_fades_in_monotonically() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.on_load_start(0);

        let mut ctx = DrawContext::new();
        let mut last = 0.0;
        for _ in 0..20 {
            orch.on_draw_frame(&mut ctx, viewport());
            assert!(orch.logo_alpha >= last);
            assert!(orch.logo_alpha <= 1.0);
            last = orch.logo_alpha;
        }
        assert!(last > 0.0);
    }

    #[test]
    fn remount_resets_all_loading_state() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.on_load_start(0);
        let mut ctx = DrawContext::new();
        orch.on_draw_frame(&mut ctx, viewport());
        assert_eq!(orch.live_count(), 1);

        orch.on_device_remount();
        assert!(!orch.is_loading());
        assert_eq!(orch.live_count(), 0);

        // The queued release empties the catalog on the next frame.
        let mut ctx = DrawContext::new();
        orch.on_draw_frame(&mut ctx, viewport());
        assert!(ctx.is_empty());
        assert!(orch.catalogs()[0].borrow().is_empty());
    }

    #[test]
    fn switching_sets_queues_teardown_of_the_previous_one() {
        let mut orch = orchestrator_with_assets(&[0, 1]);
        orch.on_load_start(0);
        orch.on_load_start(1);

        let mut ctx = DrawContext::new();
        orch.on_draw_frame(&mut ctx, viewport());

        let previous = orch.catalogs()[0].borrow();
        assert!(!previous.has_role(Role::Background));
        assert!(!previous.has_role(Role::Character));
        // Eagerly loaded logos survive a set switch.
        assert!(previous.has_role(Role::Logo));
        drop(previous);
        assert_eq!(orch.catalogs()[1].borrow().len(), 3);
    }

    #[test]
    fn reloading_the_same_set_does_not_tear_it_down() {
        let mut orch = orchestrator_with_assets(&[0]);
        orch.on_load_start(0);
        orch.on_load_start(0);

        let mut ctx = DrawContext::new();
        orch.on_draw_frame(&mut ctx, viewport());
        assert_eq!(orch.catalogs()[0].borrow().len(), 3);
    }
}
