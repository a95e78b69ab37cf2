/// Project inspection main entry point
mod report;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use mesh_loader::MeshBuffers;
use project_parser::{Chunk, ProjectDocument};
use rayon::prelude::*;

use report::{MeshSummary, ProjectSummary};

struct Options {
    input: PathBuf,
    json_output: Option<PathBuf>,
    load_meshes: bool,
}

fn parse_args(args: &[String]) -> Option<Options> {
    let mut input = None;
    let mut json_output = None;
    let mut load_meshes = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--json" => json_output = Some(PathBuf::from(iter.next()?)),
            "--meshes" => load_meshes = true,
            _ if input.is_none() => input = Some(PathBuf::from(arg)),
            _ => return None,
        }
    }
    Some(Options {
        input: input?,
        json_output,
        load_meshes,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(options) = parse_args(&args) else {
        eprintln!(
            "Usage: {} <project-file-or-directory> [--json <out.json>] [--meshes]",
            args[0]
        );
        std::process::exit(1);
    };

    let projects = discover_project_files(&options.input)?;
    if projects.is_empty() {
        return Err(format!("no project files under {}", options.input.display()).into());
    }
    println!("Found {} project file(s)", projects.len());

    let pb = ProgressBar::new(projects.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{bar:40.green/blue}] {pos}/{len} projects ({percent}%) {msg}")
            .unwrap()
            .progress_chars("█▉▊▋▌▍▎▏"),
    );
    pb.set_message("Parsing projects");

    let results: Vec<(PathBuf, project_parser::Result<ProjectDocument>)> = projects
        .par_iter()
        .map(|path| {
            let parsed = ProjectDocument::open(path);
            pb.inc(1);
            (path.clone(), parsed)
        })
        .collect();

    pb.finish_with_message("Projects parsed");

    let mut summaries = Vec::new();
    let mut failures = 0usize;
    for (path, result) in results {
        match result {
            Ok(document) => {
                let summary = ProjectSummary::from_document(&document);
                print!("{}", summary.render_text());
                if options.load_meshes {
                    for chunk in &document.chunks {
                        inspect_chunk_mesh(&path, chunk);
                    }
                }
                summaries.push(summary);
            }
            Err(err) => {
                failures += 1;
                eprintln!("Failed to parse {}: {err}", path.display());
            }
        }
    }

    if let Some(json_path) = &options.json_output {
        fs::write(json_path, serde_json::to_string_pretty(&summaries)?)?;
        println!("Wrote report: {}", json_path.display());
    }

    println!(
        "Inspected {} project(s), {} failure(s)",
        summaries.len(),
        failures
    );
    if failures > 0 {
        std::process::exit(2);
    }
    Ok(())
}

/// A single project file, or a flat scan of a directory for project files
fn discover_project_files(input: &Path) -> Result<Vec<PathBuf>, std::io::Error> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(input)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if let Some(extension) = path.extension() {
            let ext = extension.to_string_lossy().to_lowercase();
            if ext == "psx" || ext == "psz" {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Load and report the chunk's mesh when its document records one
fn inspect_chunk_mesh(project_path: &Path, chunk: &Chunk) {
    let Some(model) = &chunk.model else {
        return;
    };

    let loaded = match &model.archive_file {
        Some(archive) => {
            let entry = if model.mesh_path.is_empty() {
                constants::DEFAULT_MESH_ENTRY
            } else {
                model.mesh_path.as_str()
            };
            mesh_loader::archive::load_from_archive(archive, entry)
        }
        None => {
            let base = project_path.parent().unwrap_or(Path::new("."));
            MeshBuffers::from_file(&base.join(&model.mesh_path))
        }
    };

    match loaded {
        Ok(mesh) => print!("{}", MeshSummary::from_mesh(&mesh).render_text()),
        Err(err) => warn!(
            "could not load mesh for chunk {} of {}: {err}",
            chunk.id,
            project_path.display()
        ),
    }
}
