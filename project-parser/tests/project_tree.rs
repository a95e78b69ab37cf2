use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use project_parser::{ChunkStatus, ProjectDocument};

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut f = File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

fn write_archive(dir: &Path, name: &str, doc: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let file = File::create(&path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("doc.xml", zip::write::SimpleFileOptions::default())
        .unwrap();
    zip.write_all(doc.as_bytes()).unwrap();
    zip.finish().unwrap();
    path
}

const SINGLE_CHUNK_DOC: &str = r#"<document version="1.4.0">
  <chunks next_id="1">
    <chunk id="0" label="Scan A" enabled="true">
      <sensors next_id="3">
        <sensor id="1" label="front" type="frame">
          <resolution width="4000" height="3000"/>
          <property name="pixel_width" value="0.004"/>
          <property name="focal_length" value="24"/>
          <calibration type="frame" class="adjusted">
            <resolution width="4000" height="3000"/>
            <fx>3900.5</fx>
            <k1>-0.1</k1>
          </calibration>
        </sensor>
        <sensor id="2" label="back" type="frame"/>
      </sensors>
      <cameras next_id="13">
        <camera id="10" sensor_id="1" label="IMG_0010" enabled="true">
          <transform>1 0 0 0 0 1 0 0 0 0 1 0 0 0 0 1</transform>
        </camera>
        <camera id="11" sensor_id="1" label="IMG_0011" enabled="true"/>
        <camera id="12" sensor_id="2" label="IMG_0012" enabled="false"/>
      </cameras>
      <frames next_id="1">
        <frame id="0">
          <cameras>
            <camera camera_id="10">
              <photo path="../photos/IMG_0010.jpg"/>
              <meta>
                <property name="Exif/FNumber" value="8"/>
              </meta>
            </camera>
            <camera camera_id="11">
              <photo path="../photos/IMG_0011.jpg"/>
            </camera>
          </cameras>
          <depth_maps>
            <depth_map camera_id="10"/>
            <property name="dense_cloud/depth_downscale" value="2"/>
          </depth_maps>
          <property name="match/match_downscale" value="1"/>
          <property name="match/match_point_limit" value="40000"/>
          <property name="match/match_tiepoint_limit" value="4000"/>
          <property name="optimize/fit_k1k2k3" value="1"/>
        </frame>
      </frames>
    </chunk>
  </chunks>
</document>"#;

#[test]
fn inline_chunk_builds_full_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "scan.psx", SINGLE_CHUNK_DOC);

    let doc = ProjectDocument::open(&path).unwrap();
    assert_eq!(doc.version, "1.4.0");
    assert_eq!(doc.chunk_count(), 1);

    let chunk = &doc.chunks[0];
    assert_eq!(chunk.label, "Scan A");
    assert!(chunk.enabled);
    assert_eq!(chunk.camera_count(), 3);
    assert_eq!(chunk.image_count(), 2);
    assert_eq!(chunk.sensor_count, 2);

    // frame-context cameras link back to their chunk-level definitions
    assert!(chunk.images[0].camera_linked);
    assert_eq!(chunk.images[0].camera_id, 10);
    assert_eq!(chunk.cameras[&10].image_index, Some(0));
    assert_eq!(chunk.cameras[&10].sensor_id, 1);
    assert!(chunk.cameras[&10].sensor_linked);
    assert_eq!(
        chunk.images[0].properties.get("Exif/FNumber").unwrap(),
        "8"
    );
    assert_eq!(chunk.images[0].file_path, "../photos/IMG_0010.jpg");

    // sensor details, including calibration overriding the 1.0 default
    let front = &chunk.sensors[&1];
    assert_eq!(front.width, 4000);
    assert_eq!(front.pixel_width, 0.004);
    assert_eq!(front.fx, 3900.5);
    assert_eq!(front.k1, -0.1);
    assert_eq!(front.k2, 1.0);

    let transform = chunk.cameras[&10].transform.as_ref().unwrap();
    assert_eq!(transform.len(), 16);
    assert_eq!(transform[0], 1.0);

    // properties routed against the chunk from frame depth
    assert_eq!(chunk.alignment.feature_limit, 40_000);
    assert!(chunk.optimize.k1 && chunk.optimize.k2 && chunk.optimize.k3);
    assert!(!chunk.optimize.k4);
    assert_eq!(chunk.dense.images_used, 1);

    // two aligned of three, one depth map, no mesh yet
    assert_ne!(chunk.alignment_rank(), 5);
    assert_eq!(chunk.model_gen_rank(), 5);
    assert_eq!(chunk.status, ChunkStatus::PointCloudDone);
}

#[test]
fn resolves_references_across_files_and_archives() {
    let dir = tempfile::tempdir().unwrap();

    let stub = write_file(
        dir.path(),
        "scan.psx",
        r#"<document version="1.5.0" path="{projectname}.files/project.zip"/>"#,
    );
    write_archive(
        &dir.path().join("scan.files"),
        "project.zip",
        r#"<document version="1.5.0">
          <chunks>
            <chunk id="0" path="0/chunk.zip"/>
          </chunks>
        </document>"#,
    );
    write_archive(
        &dir.path().join("scan.files"),
        "0/chunk.zip",
        r#"<document version="1.5.0">
          <chunk id="0" label="Deep" enabled="true">
            <cameras>
              <camera id="1" sensor_id="0" label="IMG" enabled="true"/>
            </cameras>
            <frames>
              <frame id="0" path="0/frame.zip"/>
            </frames>
          </chunk>
        </document>"#,
    );
    write_archive(
        &dir.path().join("scan.files").join("0"),
        "0/frame.zip",
        r#"<document version="1.5.0">
          <frame id="0">
            <cameras>
              <camera camera_id="1">
                <photo path="img.jpg"/>
              </camera>
            </cameras>
            <model id="0" path="model/model.zip"/>
          </frame>
        </document>"#,
    );
    write_archive(
        &dir.path().join("scan.files").join("0").join("0"),
        "model/model.zip",
        r#"<document version="1.5.0">
          <model>
            <mesh path="model0.ply"/>
            <faceCount>85000</faceCount>
            <vertexCount>43000</vertexCount>
            <hasUV>true</hasUV>
            <texture id="0" path="texture0.jpg"/>
            <meta>
              <property name="atlas/atlas_width" value="4096"/>
              <property name="atlas/atlas_height" value="4096"/>
              <property name="atlas/atlas_count" value="1"/>
            </meta>
          </model>
        </document>"#,
    );

    let doc = ProjectDocument::open(&stub).unwrap();
    assert_eq!(doc.chunk_count(), 1);

    let chunk = &doc.chunks[0];
    assert_eq!(chunk.label, "Deep");
    assert_eq!(chunk.camera_count(), 1);
    assert_eq!(chunk.image_count(), 1);
    assert!(chunk.images[0].camera_linked);

    let model = chunk.model.as_ref().unwrap();
    assert_eq!(model.face_count, 85_000);
    assert_eq!(model.vertex_count, 43_000);
    assert!(model.has_uv);
    assert_eq!(model.mesh_path, "model0.ply");
    assert_eq!(model.textures[&0], "texture0.jpg");
    let archive = model.archive_file.as_ref().unwrap();
    assert!(archive.ends_with("model/model.zip"));

    // model-level meta properties decoded against the owning chunk
    assert_eq!(chunk.texture.width, 4096);
    assert_eq!(chunk.texture.count, 1);
    assert_eq!(chunk.texture_gen_rank(), 0);
}

#[test]
fn face_count_salvaged_from_legacy_property() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "scan.psx",
        r#"<document version="1.2.0">
          <chunks>
            <chunk id="0" label="Legacy" enabled="true">
              <frames>
                <frame id="0">
                  <model>
                    <mesh path="model0.ply"/>
                    <meta>
                      <property name="BuildModel/face_count" value="432"/>
                    </meta>
                  </model>
                </frame>
              </frames>
            </chunk>
          </chunks>
        </document>"#,
    );

    let doc = ProjectDocument::open(&path).unwrap();
    let model = doc.chunks[0].model.as_ref().unwrap();
    assert_eq!(model.face_count, 432);
    // plain-file source means no archive handle
    assert!(model.archive_file.is_none());
}

#[test]
fn unresolvable_chunk_does_not_abort_siblings() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(
        dir.path(),
        "scan.psx",
        r#"<document version="1.4.0">
          <chunks>
            <chunk id="1" path="missing/chunk.zip"/>
            <chunk id="2" label="survivor" enabled="true"/>
          </chunks>
        </document>"#,
    );

    let doc = ProjectDocument::open(&path).unwrap();
    assert_eq!(doc.chunk_count(), 1);
    assert_eq!(doc.chunks[0].label, "survivor");
}

#[test]
fn parsing_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "scan.psx", SINGLE_CHUNK_DOC);

    let first = ProjectDocument::open(&path).unwrap();
    let second = ProjectDocument::open(&path).unwrap();

    assert_eq!(first.chunk_count(), second.chunk_count());
    let (a, b) = (&first.chunks[0], &second.chunks[0]);
    assert_eq!(a.label, b.label);
    assert_eq!(a.camera_count(), b.camera_count());
    assert_eq!(a.image_count(), b.image_count());
    assert_eq!(a.sensors[&1].fx, b.sensors[&1].fx);
    assert_eq!(a.alignment.feature_limit, b.alignment.feature_limit);
    assert_eq!(a.status, b.status);
}

#[test]
fn active_chunk_selection_bounds_checked() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_file(dir.path(), "scan.psx", SINGLE_CHUNK_DOC);

    let mut doc = ProjectDocument::open(&path).unwrap();
    assert_eq!(doc.active_chunk_index(), 0);
    doc.set_active_chunk(5);
    assert_eq!(doc.active_chunk_index(), 0);
    assert!(doc.active_chunk().is_some());
    assert_ne!(doc.describe_alignment_phase(), "N/A");
}
