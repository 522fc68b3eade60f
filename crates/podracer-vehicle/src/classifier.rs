//! Turns raw overlap queries into race events.

use podracer_core::prelude::*;
use podracer_physics::prelude::*;

// ---------------------------------------------------------------------------
// LapGate
// ---------------------------------------------------------------------------

/// Rising-edge detector for the lap boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LapGate {
    touching: bool,
}

impl LapGate {
    /// Feed this step's raw contact. Returns `true` only on the step the
    /// contact begins.
    pub const fn update(&mut self, touching: bool) -> bool {
        let advance = touching && !self.touching;
        self.touching = touching;
        advance
    }

    pub const fn touching(&self) -> bool {
        self.touching
    }

    pub const fn reset(&mut self) {
        self.touching = false;
    }
}

// ---------------------------------------------------------------------------
// Surface classification
// ---------------------------------------------------------------------------

/// What a set of world contacts amounts to, as `(terrain, ground_hazard)`.
///
/// Contacts with the pod's own bodies and with the lap boundary are ignored.
/// Hazard wins: if any contact is a hazard, terrain is reported `false`.
pub fn classify_surfaces<'a>(
    contacts: impl IntoIterator<Item = &'a RawContact>,
    own_bodies: &[BodyId],
) -> (bool, bool) {
    let mut terrain = false;
    let mut hazard = false;
    for contact in contacts {
        if contact.owner.is_some_and(|b| own_bodies.contains(&b)) {
            continue;
        }
        if contact.surface == Some(SurfaceKind::LapBoundary)
            || contact.group.contains(CollisionGroup::LAP_BOUNDARY)
        {
            continue;
        }
        if contact.surface == Some(SurfaceKind::Hazard) {
            hazard = true;
        } else {
            terrain = true;
        }
    }
    (terrain && !hazard, hazard)
}

// ---------------------------------------------------------------------------
// ContactClassifier
// ---------------------------------------------------------------------------

/// Runs the per-step lap and surface queries for a set of probes.
#[derive(Debug, Clone, Default)]
pub struct ContactClassifier {
    probes: Vec<ContactProbe>,
    own_bodies: Vec<BodyId>,
    lap_colliders: Vec<ColliderId>,
    gate: LapGate,
}

impl ContactClassifier {
    pub fn new(
        probes: Vec<ContactProbe>,
        own_bodies: Vec<BodyId>,
        lap_colliders: Vec<ColliderId>,
    ) -> Self {
        Self {
            probes,
            own_bodies,
            lap_colliders,
            gate: LapGate::default(),
        }
    }

    /// Query `world` once and derive this step's events.
    ///
    /// An empty world, or one without a lap boundary, just yields no events.
    pub fn classify<W: CollisionWorld + ?Sized>(&mut self, world: &W) -> ContactEvent {
        let lap_touched = self.probes.iter().any(|&probe| {
            self.lap_colliders.iter().any(|&gate| {
                !world
                    .contact_test(probe, ContactTarget::Collider(gate))
                    .is_empty()
            })
        });

        let contacts: Vec<RawContact> = self
            .probes
            .iter()
            .flat_map(|&probe| world.contact_test(probe, ContactTarget::World))
            .filter(|c| !self.lap_colliders.contains(&c.collider))
            .collect();
        let (terrain, hazard) = classify_surfaces(&contacts, &self.own_bodies);

        ContactEvent {
            lap_boundary_touched: lap_touched,
            lap_advance: self.gate.update(lap_touched),
            terrain_touched: terrain,
            ground_hazard_touched: hazard,
        }
    }

    pub fn reset(&mut self) {
        self.gate.reset();
    }

    pub fn probes(&self) -> &[ContactProbe] {
        &self.probes
    }

    pub const fn gate(&self) -> &LapGate {
        &self.gate
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
