use arm_control_lib::trajectory::SegmentStart;
use arm_control_lib::types::{ControllerConfig, ControllerKind, SimulationConfig, ViaPoint};
use arm_control_lib::{
    init_tracing, Controller, ControllerCore, DhChainSim, JointTorqueController,
    PoseTrackingController, SimulationBackend,
};
use clap::Parser;
use eyre::{Result, WrapErr};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "arm_controller")]
#[command(about = "Run a torque controller against the DH-chain arm simulation")]
struct Cli {
    /// Controller configuration; falls back to $ARM_CONFIG.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(short, long, default_value = "config/sim_7dof.toml")]
    sim_config: PathBuf,

    /// Number of control ticks to run.
    #[arg(short, long, default_value_t = 2000)]
    ticks: usize,

    /// Write the evaluated reference trajectory here as JSON.
    #[arg(long)]
    history_out: Option<PathBuf>,
}

enum ArmController {
    JointTorque(JointTorqueController),
    PoseTracking(PoseTrackingController),
}

impl ArmController {
    fn as_controller(&mut self) -> &mut dyn Controller {
        match self {
            ArmController::JointTorque(c) => c,
            ArmController::PoseTracking(c) => c,
        }
    }
}

fn main() -> Result<()> {
    let _guard = init_tracing("info");
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => std::env::var("ARM_CONFIG")
            .unwrap_or_else(|_| "config/controller_7dof.toml".to_string())
            .into(),
    };

    info!("Loading controller config from: {}", config_path.display());
    let config = ControllerConfig::load_from_file(&config_path)?;
    config.validate()?;

    info!("Loading simulation config from: {}", cli.sim_config.display());
    let sim_config = SimulationConfig::load_from_file(&cli.sim_config)?;
    sim_config.validate()?;

    let mut sim = DhChainSim::from_config(&sim_config)?;
    let core = ControllerCore::from_config(&mut sim, &config)?;
    let mut controller = match config.kind {
        ControllerKind::JointTorque => ArmController::JointTorque(JointTorqueController::new(core)?),
        ControllerKind::PoseTracking => {
            ArmController::PoseTracking(PoseTrackingController::from_gains(core, &config.gains)?)
        }
    };
    info!(
        "Running {} for {} ticks",
        controller.as_controller().name()?,
        cli.ticks
    );

    let mut via_points = config.via_points().into_iter();
    let qvel_index = config.joint_indexes.qvel.clone();
    let duration = config.trajectory.segment_duration;

    if let ArmController::PoseTracking(tracker) = &mut controller {
        match via_points.next() {
            Some(target) => tracker.plan_to(&sim, &target, duration, SegmentStart::Fresh)?,
            None => warn!("No via points configured; holding the initial pose"),
        }
    }

    let report_every = (0.5 / sim_config.timestep).round().max(1.0) as usize;
    for tick in 0..cli.ticks {
        if let ArmController::PoseTracking(tracker) = &mut controller {
            advance_via_points(tracker, &sim, &mut via_points, duration)?;
        }

        let torques = controller.as_controller().compute_torques(&mut sim)?;
        sim.step_joints(&qvel_index, &torques)?;

        if tick % report_every == 0 {
            let state = controller.as_controller().core().snapshot();
            info!(
                "t={:.3}s ee=({:.4}, {:.4}, {:.4}) |τ|={:.3}",
                sim.time(),
                state.ee_pos.x,
                state.ee_pos.y,
                state.ee_pos.z,
                torques.norm()
            );
        }
    }

    if let Some(path) = &cli.history_out {
        let core = controller.as_controller().core();
        let history: Vec<_> = core.trajectory().history().iter().collect();
        let json = serde_json::to_string_pretty(&history)?;
        fs::write(path, json)
            .wrap_err_with(|| format!("failed to write history to {}", path.display()))?;
        info!("Wrote {} reference points to {}", history.len(), path.display());
    }

    Ok(())
}

/// Plan the next via point once the current segment has run out.
fn advance_via_points(
    tracker: &mut PoseTrackingController,
    sim: &DhChainSim,
    via_points: &mut impl Iterator<Item = ViaPoint>,
    duration: f64,
) -> Result<()> {
    if tracker.segment_finished(sim.time()) {
        if let Some(target) = via_points.next() {
            tracker.plan_to(sim, &target, duration, SegmentStart::Continue)?;
        }
    }
    Ok(())
}
