//! Runs a stub gdal_polygonize through the real shell.
//!
//! Kept as a single test so no other thread forks while the stub script is
//! still open for writing.
#![cfg(unix)]

use polygonizer::{Polygonizer, PolygonizeError, PolygonizeOptions, ToolLayout};
use polygonizer_core::io::write_geotiff;
use polygonizer_core::{GeoTransform, Raster, CRS};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

const STUB: &str = r#"#!/bin/sh
printf '%s\n' "$@" > "$(dirname "$0")/args.txt"
printf '%s\n' "${GDAL_ENV_MARK:-unset}" > "$(dirname "$0")/env.txt"
[ "$1" = "-8" ] && shift
out="$4"
base="${out%.shp}"
: > "$out"
: > "$base.shx"
: > "$base.dbf"
echo "0...10...20...30...40...50...60...70...80...90...100 - done."
"#;

const FAILING_STUB: &str = r#"#!/bin/sh
echo "ERROR 1: stub refused to run" >&2
exit 1
"#;

fn install_script(path: &Path, body: &str) {
    fs::write(path, body).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
}

#[test]
fn stub_tool_through_shell() {
    let install = tempfile::tempdir().unwrap();
    let data = tempfile::tempdir().unwrap();
    let scratch = tempfile::tempdir().unwrap();
    let bin = install.path().join("bin");
    fs::create_dir_all(&bin).unwrap();
    install_script(&bin.join("gdal_polygonize.py"), STUB);
    install_script(
        &bin.join("gdal env.sh"),
        "#!/bin/sh\nexport GDAL_ENV_MARK=set\n",
    );

    let layout = ToolLayout {
        env_scripts: vec!["bin/gdal env.sh".into()],
        ..ToolLayout::system()
    };

    let mut raster = Raster::from_vec(vec![1u8, 2, 2, 1], 2, 2).unwrap();
    raster.set_transform(GeoTransform::new(0.0, 2.0, 1.0, -1.0));
    raster.set_crs(Some(CRS::from_epsg(3035)));
    let input = data.path().join("land cover.tif");
    write_geotiff(&raster, &input).unwrap();

    let target = data.path().join("zones out.shp");
    let options = PolygonizeOptions {
        read_to_memory: false,
        output: Some(target.clone()),
        install_root: install.path().to_path_buf(),
        layout: layout.clone(),
        connectivity: 8,
        temp_dir: Some(scratch.path().to_path_buf()),
    };
    let result = Polygonizer::new(options.clone()).run(input.as_path()).unwrap();
    assert!(result.is_none());
    for ext in ["shp", "shx", "dbf"] {
        assert!(target.with_extension(ext).is_file());
    }

    let args = fs::read_to_string(bin.join("args.txt")).unwrap();
    let args: Vec<&str> = args.lines().collect();
    let expected_input = input.display().to_string();
    let expected_output = target.display().to_string();
    assert_eq!(
        args,
        vec![
            "-8",
            expected_input.as_str(),
            "-f",
            "ESRI Shapefile",
            expected_output.as_str(),
            "-q"
        ]
    );

    // sh backgrounds the env script, so its exports never reach the tool
    let env = fs::read_to_string(bin.join("env.txt")).unwrap();
    assert_eq!(env.trim(), "unset");

    install_script(&bin.join("gdal_polygonize.py"), FAILING_STUB);
    let options = PolygonizeOptions {
        output: None,
        ..options
    };
    let err = Polygonizer::new(options).run(&raster).unwrap_err();
    match &err {
        PolygonizeError::OutputNotCreated { output, .. } => {
            assert_eq!(output.status, Some(1));
            assert!(output.stderr.contains("stub refused to run"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(fs::read_dir(scratch.path()).unwrap().count(), 0);
}
