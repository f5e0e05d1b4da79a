//! Spritesmith CLI - build driver for map sprite atlases
//!
//! Commands: validate, build, pack
//! Outputs JSON to stdout
//! Returns non-zero on validation or build failure

use clap::{Parser, Subcommand};
use log::error;
use std::path::PathBuf;
use std::process::ExitCode;

use spritesmith_core::{
    output::write_build,
    packer::{pack, Rect},
    registry::{DirSourceStore, IconSetsConfig},
    validation::Validator,
    BuildOptions, SpritePipeline, SvgRasterizer,
};

#[derive(Parser)]
#[command(name = "spritesmith-cli")]
#[command(about = "Spritesmith CLI - Sprite Atlas Compiler")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Directory holding `<set>/<icon>.svg` sources
    #[arg(short, long, default_value = "icons")]
    sources_dir: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate an icon set configuration
    Validate {
        /// Icon set configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Build sprite atlases for every pixel ratio
    Build {
        /// Icon set configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "dist")]
        out: PathBuf,

        /// Pixel ratios to build
        #[arg(short, long, value_delimiter = ',', default_values_t = [1, 2, 3, 4])]
        ratios: Vec<u32>,
    },

    /// Pack rectangles and print the layout
    Pack {
        /// JSON array of {"id", "width", "height"}
        #[arg(short, long)]
        sizes: String,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => {
            let config = match IconSetsConfig::load(&config) {
                Ok(c) => c,
                Err(e) => {
                    println!("{}", serde_json::json!({"valid": false, "error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };

            let result = Validator::new().validate(&config);
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    error!("Failed to serialize validation result: {}", e);
                    return ExitCode::FAILURE;
                }
            }
            if result.valid {
                ExitCode::SUCCESS
            } else {
                ExitCode::from(2)  // Validation failure
            }
        }

        Commands::Build { config, out, ratios } => {
            let config = match IconSetsConfig::load(&config) {
                Ok(c) => c,
                Err(e) => {
                    println!("{}", serde_json::json!({"success": false, "error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };

            let store = DirSourceStore::new(&cli.sources_dir);
            let options = BuildOptions { pixel_ratios: ratios, ..Default::default() };
            let pipeline = SpritePipeline::with_options(SvgRasterizer::new(), options);

            let result = pipeline
                .build_config(&config, &store)
                .map_err(|e| e.to_string())
                .and_then(|build| {
                    let files = write_build(&out, &build).map_err(|e| e.to_string())?;
                    Ok((build.manifest, files))
                });

            match result {
                Ok((manifest, files)) => {
                    let output = serde_json::json!({
                        "success": true,
                        "manifest": manifest,
                        "files": files,
                    });
                    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    error!("Build failed: {}", e);
                    println!("{}", serde_json::json!({"success": false, "error": e}));
                    ExitCode::from(2)  // Build aborted, files from this run removed
                }
            }
        }

        Commands::Pack { sizes } => {
            let rects: Vec<Rect> = match serde_json::from_str(&sizes) {
                Ok(r) => r,
                Err(e) => {
                    println!("{}", serde_json::json!({"success": false, "error": format!("Invalid sizes: {}", e)}));
                    return ExitCode::FAILURE;
                }
            };

            match pack(&rects) {
                Ok(packing) => {
                    println!("{}", serde_json::to_string_pretty(&packing).unwrap_or_default());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("{}", serde_json::json!({"success": false, "error": e.to_string()}));
                    ExitCode::from(2)
                }
            }
        }
    }
}
