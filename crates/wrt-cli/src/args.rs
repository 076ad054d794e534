//! Command-line surface of the `wrt` binary.

use std::path::PathBuf;

use clap::Parser;
use wrt_graph::Request;

use crate::error::CliError;
use crate::expr;
use crate::matrix;

/// Where is frame A with respect to frame B, written in frame C's axes?
///
/// Either pass a chained expression:
///
///   wrt "In('lab').Get('cup').Wrt('table').Ei('world')"
///
/// or the same request as flags:
///
///   wrt --In lab --Set cup --Wrt table --Ei table --As "[[1,0,0,0.5],[0,1,0,0],[0,0,1,0],[0,0,0,1]]"
#[derive(Parser, Debug)]
#[command(name = "wrt", version, verbatim_doc_comment)]
pub struct Cli {
    /// Chained expression, e.g. In('w').Get('f').Wrt('r').Ei('e')
    #[arg(
        value_name = "EXPRESSION",
        conflicts_with_all = ["world", "get", "set", "wrt", "ei", "pose", "tree", "worlds", "init_config"]
    )]
    pub expression: Option<String>,

    /// World to operate in
    #[arg(long = "In", value_name = "WORLD")]
    pub world: Option<String>,

    /// Frame to query
    #[arg(long = "Get", value_name = "FRAME", conflicts_with = "set")]
    pub get: Option<String>,

    /// Frame to place
    #[arg(long = "Set", value_name = "FRAME")]
    pub set: Option<String>,

    /// Reference frame
    #[arg(long = "Wrt", value_name = "FRAME")]
    pub wrt: Option<String>,

    /// Frame whose axes the numbers are written in
    #[arg(long = "Ei", value_name = "FRAME")]
    pub ei: Option<String>,

    /// 4x4 pose for --Set, as [[r00,r01,r02,x],[r10,r11,r12,y],[r20,r21,r22,z],[0,0,0,1]]
    #[arg(long = "As", value_name = "MATRIX", allow_hyphen_values = true)]
    pub pose: Option<String>,

    /// Print the frame tree of the world given with --In
    #[arg(long = "Tree", requires = "world", conflicts_with_all = ["get", "set", "wrt", "ei", "pose", "worlds"])]
    pub tree: bool,

    /// List stored worlds
    #[arg(long = "Worlds", conflicts_with_all = ["world", "get", "set", "wrt", "ei", "pose"])]
    pub worlds: bool,

    /// Write a default ~/.wrt/config.toml if none exists
    #[arg(
        long = "init-config",
        conflicts_with_all = ["world", "get", "set", "wrt", "ei", "pose", "tree", "worlds"]
    )]
    pub init_config: bool,

    /// SQLite database to use instead of the configured one
    #[arg(long, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Print Get results and the --Worlds list as JSON
    #[arg(long)]
    pub json: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

/// What one invocation does.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Query { world: String, request: Request },
    Tree { world: String },
    Worlds,
    InitConfig,
}

impl Cli {
    /// Turn the parsed arguments into an [`Action`].  `tolerance` applies to
    /// the `As` matrix.
    pub fn action(&self, tolerance: f64) -> Result<Action, CliError> {
        if self.init_config {
            return Ok(Action::InitConfig);
        }
        if self.worlds {
            return Ok(Action::Worlds);
        }
        if let Some(src) = &self.expression {
            let parsed = expr::parse(src, tolerance)?;
            return Ok(Action::Query {
                world: parsed.world,
                request: parsed.request,
            });
        }

        let world = self.world.clone().ok_or_else(|| {
            CliError::Usage("nothing to do: pass an EXPRESSION, or --In with --Get/--Set, --Wrt and --Ei".to_string())
        })?;
        if self.tree {
            return Ok(Action::Tree { world });
        }

        let mut builder = Request::builder();
        if let Some(frame) = &self.get {
            builder = builder.get(frame.as_str());
        }
        if let Some(frame) = &self.set {
            builder = builder.set(frame.as_str());
        }
        if let Some(frame) = &self.wrt {
            builder = builder.wrt(frame.as_str());
        }
        if let Some(frame) = &self.ei {
            builder = builder.ei(frame.as_str());
        }
        if let Some(literal) = &self.pose {
            builder = builder.pose(matrix::parse_pose(literal, tolerance)?);
        }
        Ok(Action::Query {
            world,
            request: builder.build()?,
        })
    }
}
