//! Forward kinematics module
//!
//! Maps a joint state onto the screen-space skeletal pose of the thumb: three
//! rigid links (metacarpal, proximal, distal) chained from a fixed base, each
//! joint accumulating the net flexion of its predecessors.
//!
//! # Convention
//!
//! One canonical sign convention is used throughout:
//!
//! - Axes are screen-style: +X right, +Y down, +Z towards the viewer.
//! - At rest the chain points "up" the surface, i.e. pitch is -90 degrees.
//! - Net flexion adds positive pitch, curling the thumb towards +X and then
//!   +Y as flexion accumulates.
//! - Yaw is set at the base from net abduction plus a configurable fraction
//!   of net opposition, and is carried unchanged along the chain.
//! - A link of length `L` at `(pitch, yaw)` spans
//!   `L * (cos pitch * cos yaw, sin pitch, sin yaw * cos pitch)`.
//!
//! The 2.5D screen projection is oblique: `screen_x = x + k1 * z`,
//! `screen_y = y - k2 * z` for the calibration constants in [`Params`].
//!
//! Every function here is total and free of side effects: the same joint
//! state and parameters always produce the same pose.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Point2, Point3, Vector2, Vector3};

// Internal
pub use params::*;
use thumb_if::joints::{JointState, NetAngles};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// The number of joints in the projected chain (base, MCP, IP, tip).
pub const NUM_CHAIN_JOINTS: usize = 4;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single joint of the skeletal pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JointNode {
    /// Position in model space.
    pub position: Point3<f64>,

    /// Rendered link width at this joint.
    pub width: f64,
}

/// The skeletal pose of the thumb, base to tip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkeletalPose {
    /// The CMC base joint (fixed).
    pub base: JointNode,

    /// The MCP joint.
    pub mcp: JointNode,

    /// The IP joint.
    pub ip: JointNode,

    /// The thumb tip (end effector).
    pub tip: JointNode,
}

/// The pose projected onto the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPose {
    /// Projected joint positions, base to tip.
    pub points: [Point2<f64>; NUM_CHAIN_JOINTS],

    /// Link width at each projected joint.
    pub widths: [f64; NUM_CHAIN_JOINTS],
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the skeletal pose for the given joint state.
pub fn compute_pose(state: &JointState, params: &Params) -> SkeletalPose {
    let net = NetAngles::from_state(state);

    // Base yaw, carried unchanged along the chain
    let yaw_deg = net.cmc_abd_net + params.opposition_yaw_gain * net.cmc_opp_net;

    let base = Point3::new(
        params.base_position[0],
        params.base_position[1],
        params.base_position[2],
    );

    // Pitch accumulates the net flexion of each successive joint
    let mut pitch_deg = params.rest_pitch_deg + net.cmc_flex_net;
    let mcp = base + link_vector(params.metacarpal_length, pitch_deg, yaw_deg);

    pitch_deg += net.mcp_flex_net;
    let ip = mcp + link_vector(params.proximal_length, pitch_deg, yaw_deg);

    pitch_deg += net.ip_flex_net;
    let tip = ip + link_vector(params.distal_length, pitch_deg, yaw_deg);

    SkeletalPose {
        base: JointNode {
            position: base,
            width: params.joint_widths[0],
        },
        mcp: JointNode {
            position: mcp,
            width: params.joint_widths[1],
        },
        ip: JointNode {
            position: ip,
            width: params.joint_widths[2],
        },
        tip: JointNode {
            position: tip,
            width: params.joint_widths[3],
        },
    }
}

/// Return the four corners of the trapezoidal outline of a link between two
/// projected joints.
///
/// Corners are ordered for polygon rendering: start-left, end-left,
/// end-right, start-right, where left/right is relative to the link
/// direction. The offset is perpendicular to the segment at half the given
/// width.
pub fn segment_outline(start: &Point2<f64>, end: &Point2<f64>, width: f64) -> [Point2<f64>; 4] {
    let angle = (end.y - start.y).atan2(end.x - start.x);
    let (sin, cos) = (angle.sin(), angle.cos());
    let half_width = width / 2.0;

    let offset = Vector2::new(-half_width * sin, half_width * cos);

    [
        start + offset,
        end + offset,
        end - offset,
        start - offset,
    ]
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// The model-space span of a link at the given orientation.
fn link_vector(length: f64, pitch_deg: f64, yaw_deg: f64) -> Vector3<f64> {
    let pitch = pitch_deg.to_radians();
    let yaw = yaw_deg.to_radians();

    Vector3::new(
        length * pitch.cos() * yaw.cos(),
        length * pitch.sin(),
        length * yaw.sin() * pitch.cos(),
    )
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SkeletalPose {
    /// Project the pose onto the rendering surface.
    pub fn project(&self, params: &Params) -> ScreenPose {
        let joints = [&self.base, &self.mcp, &self.ip, &self.tip];

        let mut points = [Point2::origin(); NUM_CHAIN_JOINTS];
        let mut widths = [0.0; NUM_CHAIN_JOINTS];

        for (i, joint) in joints.iter().enumerate() {
            let p = joint.position;
            points[i] = Point2::new(
                p.x + params.projection_k1 * p.z,
                p.y - params.projection_k2 * p.z,
            );
            widths[i] = joint.width;
        }

        ScreenPose { points, widths }
    }
}

impl ScreenPose {
    /// The trapezoidal outlines of the three links, base to tip.
    pub fn link_outlines(&self) -> [[Point2<f64>; 4]; 3] {
        [
            segment_outline(&self.points[0], &self.points[1], self.widths[1]),
            segment_outline(&self.points[1], &self.points[2], self.widths[2]),
            segment_outline(&self.points[2], &self.points[3], self.widths[3]),
        ]
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use thumb_if::cmd::TrialPreset;

    const TOL: f64 = 1e-9;

    fn assert_point_eq(a: &Point3<f64>, b: &Point3<f64>) {
        assert!((a.x - b.x).abs() < TOL, "x: {} != {}", a.x, b.x);
        assert!((a.y - b.y).abs() < TOL, "y: {} != {}", a.y, b.y);
        assert!((a.z - b.z).abs() < TOL, "z: {} != {}", a.z, b.z);
    }

    #[test]
    fn test_deterministic() {
        let params = Params::default();
        let state = TrialPreset::Pinch.joint_state();

        let a = compute_pose(&state, &params);
        let b = compute_pose(&state, &params);

        assert_eq!(a, b);
    }

    #[test]
    fn test_rest_pose_is_colinear() {
        let params = Params::default();
        let pose = compute_pose(&JointState::rest(), &params);

        let base = pose.base.position;

        // At rest the chain points straight up the surface (-Y), each joint
        // offset by its link length
        assert_point_eq(&pose.mcp.position, &Point3::new(base.x, base.y - 50.0, base.z));
        assert_point_eq(&pose.ip.position, &Point3::new(base.x, base.y - 80.0, base.z));
        assert_point_eq(
            &pose.tip.position,
            &Point3::new(base.x, base.y - 100.0, base.z),
        );
    }

    #[test]
    fn test_curl_pitch_increases_along_chain() {
        let params = Params::default();
        let pose = compute_pose(&TrialPreset::Curl.joint_state(), &params);

        // Curl has no abduction or opposition, so the chain stays in the XY
        // plane and each segment's direction angle is its accumulated pitch
        let segment_pitch = |a: &JointNode, b: &JointNode| {
            (b.position.y - a.position.y).atan2(b.position.x - a.position.x)
        };

        let p1 = segment_pitch(&pose.base, &pose.mcp);
        let p2 = segment_pitch(&pose.mcp, &pose.ip);
        let p3 = segment_pitch(&pose.ip, &pose.tip);

        assert!(pose.base.position.z.abs() < TOL);
        assert!(pose.tip.position.z.abs() < TOL);
        assert!(p2 > p1, "expected pitch to increase: {} -> {}", p1, p2);
        assert!(p3 > p2, "expected pitch to increase: {} -> {}", p2, p3);

        // -90 + 40 = -50 deg at the metacarpal
        assert!((p1 - (-50f64).to_radians()).abs() < TOL);
    }

    #[test]
    fn test_abduction_moves_tip_out_of_plane() {
        let params = Params::default();
        let state = JointState {
            cmc_abd: 30.0,
            ..JointState::rest()
        };

        let pose = compute_pose(&state, &params);

        // Positive yaw pushes the chain towards +Z; at rest pitch the
        // cos(pitch) factor suppresses it, so flex a little too
        let flexed = JointState {
            cmc_abd: 30.0,
            cmc_flex: 45.0,
            ..JointState::rest()
        };
        let flexed_pose = compute_pose(&flexed, &params);

        assert!(flexed_pose.tip.position.z > pose.base.position.z);
    }

    #[test]
    fn test_total_for_extreme_angles() {
        let params = Params::default();
        let state = JointState {
            cmc_flex: 180.0,
            cmc_ext: 180.0,
            cmc_abd: 180.0,
            mcp_flex: 180.0,
            ip_flex: 180.0,
            ..JointState::rest()
        };

        let pose = compute_pose(&state, &params);

        for joint in [&pose.base, &pose.mcp, &pose.ip, &pose.tip].iter() {
            assert!(joint.position.x.is_finite());
            assert!(joint.position.y.is_finite());
            assert!(joint.position.z.is_finite());
        }
    }

    #[test]
    fn test_projection_identity_in_plane() {
        let params = Params::default();
        let pose = compute_pose(&TrialPreset::Curl.joint_state(), &params);
        let screen = pose.project(&params);

        // Curl stays at z = 0, so the projection is the XY position
        assert!((screen.points[3].x - pose.tip.position.x).abs() < TOL);
        assert!((screen.points[3].y - pose.tip.position.y).abs() < TOL);
    }

    #[test]
    fn test_projection_applies_depth_factors() {
        let params = Params::default();
        let node = SkeletalPose {
            base: JointNode {
                position: Point3::new(10.0, 20.0, 4.0),
                width: 1.0,
            },
            mcp: JointNode {
                position: Point3::origin(),
                width: 1.0,
            },
            ip: JointNode {
                position: Point3::origin(),
                width: 1.0,
            },
            tip: JointNode {
                position: Point3::origin(),
                width: 1.0,
            },
        };

        let screen = node.project(&params);

        assert!((screen.points[0].x - (10.0 + 0.5 * 4.0)).abs() < TOL);
        assert!((screen.points[0].y - (20.0 - 0.3 * 4.0)).abs() < TOL);
    }

    #[test]
    fn test_segment_outline_is_perpendicular() {
        // Horizontal segment: offsets should be purely vertical
        let corners = segment_outline(
            &Point2::new(0.0, 0.0),
            &Point2::new(10.0, 0.0),
            4.0,
        );

        assert!((corners[0].x - 0.0).abs() < TOL);
        assert!((corners[0].y - 2.0).abs() < TOL);
        assert!((corners[1].x - 10.0).abs() < TOL);
        assert!((corners[1].y - 2.0).abs() < TOL);
        assert!((corners[2].y - (-2.0)).abs() < TOL);
        assert!((corners[3].y - (-2.0)).abs() < TOL);
    }
}
