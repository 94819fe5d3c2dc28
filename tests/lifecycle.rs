// lifecycle.rs - Mount, run, resize and tear down through the public API

use ink_engine::headless::HeadlessBackend;
use ink_engine::sim::{InkWorld, MAX_DROPLETS};
use ink_engine::{Animation, Config, EffectKind, FrameEvents, ParticleField, Scene, Settings, Viewport, Vortex};

fn seeded(seed: u64) -> Settings {
    Settings { seed: Some(seed), ..Settings::default() }
}

fn boxed(settings: &Settings, viewport: Viewport) -> Box<dyn Animation> {
    match settings.kind {
        EffectKind::Ink => Box::new(InkWorld::new(settings, viewport)),
        EffectKind::Particles => Box::new(ParticleField::new(settings, viewport)),
        EffectKind::Vortex => Box::new(Vortex::new(viewport)),
    }
}

#[test]
fn two_seconds_of_ink_stay_within_limits() {
    let vp = Viewport::new(800, 600);
    let mut scene = Scene::new(HeadlessBackend::new(), InkWorld::new(&seeded(3), vp), vp).unwrap();

    for _ in 0..120 {
        scene.frame(0.016).unwrap();
        let world = scene.animation();
        assert!(world.droplets().len() <= MAX_DROPLETS);
        for drip in world.drips() {
            assert!(drip.length <= drip.max_length * 1.05, "drip overshot: {} > {}", drip.length, drip.max_length);
            assert!(drip.length >= 0.0);
        }
    }
    assert_eq!(scene.backend().frames(), 120);
    assert_eq!(scene.backend().draws_last_frame(), scene.live_handles());
}

#[test]
fn dispose_empties_the_container() {
    let vp = Viewport::new(800, 600);
    let mut scene = Scene::new(HeadlessBackend::new(), InkWorld::new(&seeded(4), vp), vp).unwrap();
    assert_eq!(scene.backend().container_children(), 1);

    scene.dispose();
    assert_eq!(scene.backend().container_children(), 0);
    assert!(!scene.backend().context_alive());
    assert_eq!(scene.backend().live(), 0);
}

#[test]
fn dispose_twice_releases_nothing_twice() {
    let vp = Viewport::new(640, 480);
    let mut scene = Scene::new(HeadlessBackend::new(), InkWorld::new(&seeded(5), vp), vp).unwrap();
    for _ in 0..300 {
        scene.frame(0.016).unwrap();
    }
    assert!(scene.dispose());
    assert!(!scene.dispose());
    assert_eq!(scene.backend().double_releases(), 0);
    assert_eq!(scene.backend().container_children(), 0);
}

#[test]
fn identical_droplets_merge_into_one() {
    let vp = Viewport::new(800, 600);
    let mut world = InkWorld::without_strokes(&seeded(6), vp);
    let mut events = FrameEvents::default();

    let a = world.place_droplet(0.0, 0.0, 0.1, &mut events).unwrap();
    let b = world.place_droplet(0.0, 0.0, 0.1, &mut events).unwrap();
    events.clear();

    world.step(0.016, &mut events);

    let drops = world.droplets();
    assert_eq!(drops.len(), 1);
    assert!((drops.size[0] - 0.1 * 2f32.sqrt()).abs() < 1e-5);
    assert!(events.released.contains(&a) && events.released.contains(&b));
    assert_eq!(events.spawned, vec![drops.id[0]]);
}

#[test]
fn zero_sized_container_keeps_a_finite_aspect() {
    let vp = Viewport::new(800, 600);
    let mut scene = Scene::new(HeadlessBackend::new(), InkWorld::new(&seeded(7), vp), vp).unwrap();
    scene.resize(0, 0);
    assert!(scene.viewport().aspect().is_finite());
    scene.frame(0.016).unwrap();
    scene.resize(1024, 768);
    assert_eq!(scene.backend().viewport(), Viewport::new(1024, 768));
}

#[test]
fn every_kind_runs_behind_a_box() {
    let vp = Viewport::from_css(1280.0, 720.0);
    for kind in [EffectKind::Ink, EffectKind::Particles, EffectKind::Vortex] {
        let settings = Settings { kind, ..seeded(8) };
        let mut scene = Scene::new(HeadlessBackend::new(), boxed(&settings, vp), vp).unwrap();
        scene.pointer(640.0, 360.0);
        for _ in 0..30 {
            scene.frame(0.016).unwrap();
        }
        assert!(scene.backend().draws_last_frame() > 0, "{kind:?} drew nothing");
        assert!(scene.dispose());
        assert_eq!(scene.backend().live(), 0);
    }
}

#[test]
fn options_flow_from_json_to_the_world() {
    let config = Config::from_json(r##"{ "ink": "#123", "background": "#ffffff", "seed": 42 }"##).unwrap();
    let settings = config.validate().unwrap();
    let vp = Viewport::new(800, 600);

    let mut a = Scene::new(HeadlessBackend::new(), InkWorld::new(&settings, vp), vp).unwrap();
    let mut b = Scene::new(HeadlessBackend::new(), InkWorld::new(&settings, vp), vp).unwrap();
    for _ in 0..200 {
        a.frame(0.016).unwrap();
        b.frame(0.016).unwrap();
    }
    assert_eq!(a.backend().background(), Some(settings.background));
    assert_eq!(a.animation().live_ids(), b.animation().live_ids());
    assert_eq!(a.backend().created(), b.backend().created());
}

#[test]
fn negative_width_is_refused() {
    let config = Config::from_json(r#"{ "width": -10 }"#).unwrap();
    assert!(matches!(config.validate(), Err(ink_engine::Error::InvalidDimension { field: "width", .. })));
}
