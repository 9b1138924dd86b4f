use crate::backend::{SimulationBackend, SiteId};
use crate::types::{JointIndexes, KinematicSnapshot};
use nalgebra::{DVector, Matrix6xX};
use tracing::{debug, trace};

/// Lazily refreshed [`KinematicSnapshot`] of one arm.
///
/// The backend is only queried when the cache has been invalidated (after a
/// torque command was produced) or when a refresh is forced.
#[derive(Debug, Clone)]
pub struct StateCache {
    site: SiteId,
    indexes: JointIndexes,
    snapshot: KinematicSnapshot,
    new_update: bool,
    refreshes: usize,
}

impl StateCache {
    /// An empty, stale cache; the first [`StateCache::update`] populates it.
    pub fn new(site: SiteId, indexes: JointIndexes) -> Self {
        let snapshot = KinematicSnapshot::zeros(indexes.dim());
        Self {
            site,
            indexes,
            snapshot,
            new_update: true,
            refreshes: 0,
        }
    }

    /// Refresh from the backend if stale or `force` is set. Returns whether a
    /// refresh happened.
    pub fn update(&mut self, sim: &mut dyn SimulationBackend, force: bool) -> bool {
        if !(self.new_update || force) {
            trace!("State cache still valid, skipping backend query");
            return false;
        }

        sim.forward();

        let qvel_index = &self.indexes.qvel;
        let qpos = sim.qpos();
        let qvel = sim.qvel();
        let joint_pos = DVector::from_iterator(
            self.indexes.qpos.len(),
            self.indexes.qpos.iter().map(|&i| qpos[i]),
        );
        let joint_vel =
            DVector::from_iterator(qvel_index.len(), qvel_index.iter().map(|&i| qvel[i]));

        let j_pos = sim.site_jacp(self.site).select_columns(qvel_index.iter());
        let j_ori = sim.site_jacr(self.site).select_columns(qvel_index.iter());
        let j_full = Matrix6xX::from_fn(qvel_index.len(), |r, c| {
            if r < 3 {
                j_pos[(r, c)]
            } else {
                j_ori[(r - 3, c)]
            }
        });

        // principal submatrix, so symmetry carries over
        let mass_matrix = sim
            .full_mass_matrix()
            .select_rows(qvel_index.iter())
            .select_columns(qvel_index.iter());

        self.snapshot = KinematicSnapshot {
            ee_pos: sim.site_xpos(self.site),
            ee_ori_mat: sim.site_xmat(self.site),
            ee_pos_vel: sim.site_xvelp(self.site),
            ee_ori_vel: sim.site_xvelr(self.site),
            joint_pos,
            joint_vel,
            j_pos,
            j_ori,
            j_full,
            mass_matrix,
        };

        self.new_update = false;
        self.refreshes += 1;
        debug!(
            "State cache refreshed (#{}) at t={:.4}: ee=({:.4}, {:.4}, {:.4})",
            self.refreshes,
            sim.time(),
            self.snapshot.ee_pos.x,
            self.snapshot.ee_pos.y,
            self.snapshot.ee_pos.z
        );
        true
    }

    /// Mark the snapshot stale so the next update re-queries the backend.
    pub fn invalidate(&mut self) {
        self.new_update = true;
    }

    pub fn is_stale(&self) -> bool {
        self.new_update
    }

    pub fn snapshot(&self) -> &KinematicSnapshot {
        &self.snapshot
    }

    pub fn site(&self) -> SiteId {
        self.site
    }

    pub fn indexes(&self) -> &JointIndexes {
        &self.indexes
    }

    /// How many times the backend has actually been queried.
    pub fn refresh_count(&self) -> usize {
        self.refreshes
    }
}
