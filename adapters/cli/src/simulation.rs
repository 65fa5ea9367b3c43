use endless_road_core::{Command, Event, GenerationConfig, PrototypeSet, StaticGeometry};
use endless_road_system_generation::GenerationDriver;
use endless_road_world::{self as world, query, World};
use glam::DVec3;

/// Headless loop moving an observer along the track at a constant speed.
#[derive(Debug)]
pub(crate) struct Simulation {
    world: World,
    driver: GenerationDriver,
    observer: DVec3,
    speed: f64,
}

impl Simulation {
    pub(crate) fn new(
        config: GenerationConfig,
        prototypes: PrototypeSet,
        geometry: &StaticGeometry,
        speed: f64,
    ) -> anyhow::Result<Self> {
        let observer = config.origin;
        let world = World::new(config, prototypes, geometry)?;
        Ok(Self {
            world,
            driver: GenerationDriver::new(),
            observer,
            speed,
        })
    }

    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// Fills the window before the observer starts moving.
    pub(crate) fn prime(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::PrimeWindow, &mut events);
        events
    }

    /// Advances the observer by one tick and returns the events it caused.
    pub(crate) fn step(&mut self) -> Vec<Event> {
        self.observer.x += self.speed;

        let mut events = Vec::new();
        world::apply(
            &mut self.world,
            Command::MoveObserver {
                position: self.observer,
            },
            &mut events,
        );

        let mut commands = Vec::new();
        self.driver
            .handle(&events, &query::window_view(&self.world), &mut commands);
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }
        events
    }

    /// Advances requested by the generation driver so far.
    #[cfg(test)]
    pub(crate) fn requested_advances(&self) -> u64 {
        self.driver.requested()
    }
}
