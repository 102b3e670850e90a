/// Statistics builder: reads a GeoJSON district layer and a multi-band
/// Tmin GeoTIFF, runs the zonal pipeline, writes the statistics CSV
/// artifact, and prints the coldest/warmest rankings for the latest year.
///
/// The GeoTIFF is expected one band per IFD, all bands sharing shape and
/// georeferencing. The affine transform comes from the ModelPixelScale and
/// ModelTiepoint tags; the nodata sentinel from the GDAL_NODATA tag. Both
/// can be overridden on the command line for files missing the tags.
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;

use friaje_core::{DistrictLayer, GridTransform, TminRaster, ZonalPipeline};
use geo_types::{Geometry, MultiPolygon};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "zonal_report",
    about = "Per-district Tmin zonal statistics: GeoJSON + GeoTIFF -> CSV + rankings"
)]
struct Args {
    /// District boundary layer (GeoJSON FeatureCollection)
    #[arg(long)]
    boundaries: PathBuf,

    /// Multi-band minimum-temperature raster (GeoTIFF, one band per IFD)
    #[arg(long)]
    raster: PathBuf,

    /// Output path for the statistics CSV artifact
    #[arg(short, long, default_value = "tmin_stats.csv")]
    output: PathBuf,

    /// Nodata sentinel, used when the raster carries no GDAL_NODATA tag
    #[arg(long, default_value = "-9999")]
    nodata: f32,

    /// Multiplier applied to every sample (0.1 for rasters scaled x10 to deci-degrees)
    #[arg(long, default_value = "1.0")]
    scale: f32,

    /// Affine override "origin_x,origin_y,pixel_width,pixel_height" when
    /// the raster carries no georeferencing tags
    #[arg(long)]
    transform: Option<String>,

    /// Number of districts in each ranking
    #[arg(long, default_value = "15")]
    top: usize,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let layer = load_boundaries(&args.boundaries)
        .with_context(|| format!("loading boundaries from {}", args.boundaries.display()))?;
    info!("loaded {} districts", layer.len());

    let raster = load_raster(&args)
        .with_context(|| format!("loading raster from {}", args.raster.display()))?;
    info!(
        "loaded raster: {} x {} px, {} band(s), nodata {}",
        raster.width(),
        raster.height(),
        raster.band_count(),
        raster.nodata()
    );

    let pipeline = ZonalPipeline::build(&layer, &raster)?;
    pipeline.table().write_csv_path(&args.output)?;
    info!(
        "wrote {} rows to {}",
        pipeline.table().len(),
        args.output.display()
    );

    let year = pipeline.latest_year();
    println!("\nColdest {} districts by mean Tmin, {year}:", args.top);
    for r in pipeline.coldest(year, args.top) {
        println!("  {:<8} {:<24} {:>7.2} C", r.ubigeo, r.district, r.mean);
    }
    println!("\nWarmest {} districts by mean Tmin, {year}:", args.top);
    for r in pipeline.warmest(year, args.top) {
        println!("  {:<8} {:<24} {:>7.2} C", r.ubigeo, r.district, r.mean);
    }

    Ok(())
}

// ── Boundary loading ─────────────────────────────────────────────────────────

/// Property keys tried for each attribute, in order. Shapefile-derived
/// layers truncate "DEPARTAMENTO" to "DEPARTAMEN".
const UBIGEO_KEYS: &[&str] = &["UBIGEO", "IDDIST", "CODIGO"];
const DEPARTMENT_KEYS: &[&str] = &["DEPARTAMEN", "DEPARTAMENTO", "NOMBDEP"];
const PROVINCE_KEYS: &[&str] = &["PROVINCIA", "NOMBPROV"];
const DISTRICT_KEYS: &[&str] = &["DISTRITO", "NOMBDIST", "NOMBRE"];

fn load_boundaries(path: &PathBuf) -> Result<DistrictLayer> {
    let text = std::fs::read_to_string(path)?;
    let geojson: geojson::GeoJson = text.parse()?;
    let collection = match geojson {
        geojson::GeoJson::FeatureCollection(fc) => fc,
        _ => bail!("expected a GeoJSON FeatureCollection"),
    };

    let mut districts = Vec::with_capacity(collection.features.len());
    for (i, feature) in collection.features.into_iter().enumerate() {
        let props = feature
            .properties
            .with_context(|| format!("feature {i} has no properties"))?;
        let geometry = feature
            .geometry
            .with_context(|| format!("feature {i} has no geometry"))?;
        let geometry: Geometry<f64> = geometry
            .value
            .try_into()
            .map_err(|e| anyhow::anyhow!("feature {i}: unsupported geometry: {e}"))?;
        let geometry = match geometry {
            Geometry::MultiPolygon(mp) => mp,
            Geometry::Polygon(p) => MultiPolygon(vec![p]),
            other => bail!("feature {i}: expected (Multi)Polygon, got {other:?}"),
        };

        districts.push(friaje_core::District {
            ubigeo: property(&props, UBIGEO_KEYS)
                .with_context(|| format!("feature {i}: no UBIGEO property"))?,
            department: property(&props, DEPARTMENT_KEYS)
                .with_context(|| format!("feature {i}: no department property"))?,
            province: property(&props, PROVINCE_KEYS).unwrap_or_default(),
            district: property(&props, DISTRICT_KEYS)
                .with_context(|| format!("feature {i}: no district name property"))?,
            geometry,
        });
    }

    Ok(DistrictLayer::new(districts)?)
}

/// First matching property, stringified. UBIGEO codes sometimes arrive as
/// numbers.
fn property(props: &serde_json::Map<String, serde_json::Value>, keys: &[&str]) -> Option<String> {
    for key in keys {
        match props.get(*key) {
            Some(serde_json::Value::String(s)) => return Some(s.clone()),
            Some(serde_json::Value::Number(n)) => return Some(n.to_string()),
            _ => {}
        }
    }
    None
}

// ── Raster loading ───────────────────────────────────────────────────────────

fn load_raster(args: &Args) -> Result<TminRaster> {
    let file = BufReader::new(File::open(&args.raster)?);
    let mut decoder = Decoder::new(file)?;
    let (width, height) = decoder.dimensions()?;

    let transform = match &args.transform {
        Some(spec) => parse_transform(spec)?,
        None => geotiff_transform(&mut decoder)?,
    };
    let nodata = geotiff_nodata(&mut decoder).unwrap_or(args.nodata);

    let mut raster = TminRaster::new(width as usize, height as usize, transform, nodata)?;
    loop {
        raster.push_band(read_band(&mut decoder, args.scale, nodata)?)?;
        if !decoder.more_images() {
            break;
        }
        decoder.next_image()?;
        let (w, h) = decoder.dimensions()?;
        if (w, h) != (width, height) {
            bail!(
                "band {} shape {w}x{h} differs from band 1 shape {width}x{height}",
                raster.band_count() + 1
            );
        }
    }
    Ok(raster)
}

/// Affine from the GeoTIFF ModelPixelScale + ModelTiepoint tags. Only the
/// common north-up tiepoint form (raster point 0,0 pinned to a world
/// coordinate) is supported.
fn geotiff_transform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Result<GridTransform> {
    let scale = decoder
        .get_tag_f64_vec(Tag::ModelPixelScaleTag)
        .context("raster has no ModelPixelScale tag; pass --transform")?;
    let tiepoint = decoder
        .get_tag_f64_vec(Tag::ModelTiepointTag)
        .context("raster has no ModelTiepoint tag; pass --transform")?;
    if scale.len() < 2 || tiepoint.len() < 6 {
        bail!("malformed georeferencing tags");
    }
    let (i, j, x, y) = (tiepoint[0], tiepoint[1], tiepoint[3], tiepoint[4]);
    Ok(GridTransform::new(
        x - i * scale[0],
        y + j * scale[1],
        scale[0],
        scale[1],
    ))
}

fn geotiff_nodata<R: std::io::Read + std::io::Seek>(decoder: &mut Decoder<R>) -> Option<f32> {
    decoder
        .get_tag_ascii_string(Tag::GdalNodata)
        .ok()
        .and_then(|s| s.trim().trim_end_matches('\0').parse().ok())
}

fn parse_transform(spec: &str) -> Result<GridTransform> {
    let parts: Vec<f64> = spec
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .context("transform must be four comma-separated numbers")?;
    if parts.len() != 4 {
        bail!("transform must be origin_x,origin_y,pixel_width,pixel_height");
    }
    Ok(GridTransform::new(parts[0], parts[1], parts[2], parts[3]))
}

/// Decode the current IFD into f32 samples. Integer rasters get the
/// --scale multiplier (deci-degree products ship as i16 x10); nodata
/// samples are kept as the raw sentinel so the engine can match them.
fn read_band<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
    scale: f32,
    nodata: f32,
) -> Result<Vec<f32>> {
    let rescale = |v: f32| if v == nodata { v } else { v * scale };
    let band = match decoder.read_image()? {
        DecodingResult::F32(buf) => buf,
        DecodingResult::F64(buf) => buf.into_iter().map(|v| v as f32).collect(),
        DecodingResult::I16(buf) => buf.into_iter().map(|v| rescale(v as f32)).collect(),
        DecodingResult::I32(buf) => buf.into_iter().map(|v| rescale(v as f32)).collect(),
        DecodingResult::U8(buf) => buf.into_iter().map(|v| rescale(v as f32)).collect(),
        DecodingResult::U16(buf) => buf.into_iter().map(|v| rescale(v as f32)).collect(),
        _ => bail!("unsupported raster sample format"),
    };
    Ok(band)
}
