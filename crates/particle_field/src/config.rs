//! All of the user config for the particle field.

use std::str::FromStr as _;

use color_eyre::eyre::{bail, eyre, ContextCompat as _, Result};

use particle_field_protocol::Colour;

/// A copy of the default config file. It gets copied to the user's config folder the first time
/// they start the particle field.
static DEFAULT_CONFIG: &str = include_str!("../default_config.toml");

/// The name of the directory, inside the system's config directory, where our config is kept.
const CONFIG_DIRECTORY_NAME: &str = "particle-field";

/// The name of the main config file.
pub const DEFAULT_CONFIG_FILE_NAME: &str = "particle-field.toml";

/// The valid log levels. Based on our `tracing` crate.
#[derive(serde::Serialize, serde::Deserialize, clap::ValueEnum, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    /// Error
    Error,
    /// Warnings
    Warn,
    /// Info
    Info,
    /// Debug
    Debug,
    /// Trace
    Trace,
    /// No logging
    Off,
}

/// A colour as written in the config file: `"#rrggbb"` or `"#rrggbbaa"`.
#[derive(serde::Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(try_from = "String")]
pub struct ConfigColour(pub Colour);

impl TryFrom<String> for ConfigColour {
    type Error = color_eyre::Report;

    fn try_from(hex: String) -> Result<Self> {
        Ok(Self(parse_hex_colour(&hex)?))
    }
}

/// Parse a hex colour with an optional trailing alpha byte.
pub fn parse_hex_colour(hex: &str) -> Result<Colour> {
    let digits = hex.trim().trim_start_matches('#');
    let (rgb_digits, maybe_alpha_digits) = match digits.len() {
        6 => (digits, None),
        8 => (
            digits.get(..6).context("Couldn't split RGB from alpha")?,
            digits.get(6..),
        ),
        _ => bail!("Colours must look like '#rrggbb' or '#rrggbbaa', got: '{hex}'"),
    };

    let rgb = palette::Srgb::<u8>::from_str(rgb_digits)
        .map_err(|error| eyre!("Invalid colour '{hex}': {error}"))?
        .into_format::<f32>();

    let alpha = match maybe_alpha_digits {
        Some(alpha_digits) => f32::from(u8::from_str_radix(alpha_digits, 16)?) / 255.0,
        None => 1.0,
    };

    Ok((rgb.red, rgb.green, rgb.blue, alpha))
}

/// Managing user config.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    /// The maximum log level
    pub log_level: LogLevel,
    /// The location of the log file.
    pub log_path: std::path::PathBuf,
    /// Target frame rate
    pub frame_rate: u32,
    /// The look and the physics of the particle field.
    pub field: FieldConfig,
}

impl Default for Config {
    fn default() -> Self {
        let log_directory = match dirs::state_dir() {
            Some(directory) => directory,
            None => std::path::PathBuf::new().join("./"),
        };
        let log_path = log_directory
            .join(CONFIG_DIRECTORY_NAME)
            .join("particle-field.log");

        Self {
            log_level: LogLevel::Off,
            log_path,
            frame_rate: 30,
            field: FieldConfig::default(),
        }
    }
}

/// The flat set of parameters that define the particle field. Fixed for the life of the process.
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(default)]
pub struct FieldConfig {
    /// Fill colour of every particle.
    pub particle_colour: ConfigColour,
    /// Smallest possible particle radius, in pixels.
    pub particle_min_size: f32,
    /// Largest possible particle radius, in pixels.
    pub particle_max_size: f32,
    /// Opacity applied on top of the particle colour's own alpha.
    pub particle_opacity: f32,
    /// Upper limit of particles, however big the terminal.
    pub max_particles: usize,
    /// Pixels of area per particle. Bigger means fewer particles.
    pub area_per_particle: f32,
    /// Distance at which the pointer starts to pull particles.
    pub attract_radius: f32,
    /// How hard the pointer pulls at zero distance.
    pub attract_strength: f32,
    /// Spring constant pulling particles back to where they spawned.
    pub spring_home: f32,
    /// Speed cap, in pixels per frame.
    pub max_speed: f32,
    /// Maximum random jitter added to each velocity component every frame.
    pub drift: f32,
    /// Maximum speed, per axis, of a newly spawned particle.
    pub initial_velocity: f32,
    /// Particles closer than this are linked with a line. 0 disables links.
    pub link_radius: f32,
    /// Colour of the link lines.
    pub link_colour: ConfigColour,
    /// Opacity of a link between two particles at zero distance.
    pub link_opacity: f32,
    /// Optionally paint the whole surface before every frame.
    pub background_colour: Option<ConfigColour>,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            particle_colour: ConfigColour((0.0, 4.0 / 255.0, 8.0 / 255.0, 1.0)),
            particle_min_size: 1.2,
            particle_max_size: 2.4,
            particle_opacity: 0.9,
            max_particles: 240,
            area_per_particle: 10_000.0,
            attract_radius: 140.0,
            attract_strength: 0.16,
            spring_home: 0.015,
            max_speed: 1.6,
            drift: 0.08,
            initial_velocity: 0.2,
            link_radius: 65.0,
            link_colour: ConfigColour((0.0, 0.0, 0.0, 64.0 / 255.0)),
            link_opacity: 0.6,
            background_colour: None,
        }
    }
}

impl FieldConfig {
    /// Reject values that would make the simulation panic or divide by zero.
    pub fn validate(&self) -> Result<()> {
        let numbers = [
            ("particle_min_size", self.particle_min_size),
            ("particle_max_size", self.particle_max_size),
            ("particle_opacity", self.particle_opacity),
            ("area_per_particle", self.area_per_particle),
            ("attract_radius", self.attract_radius),
            ("attract_strength", self.attract_strength),
            ("spring_home", self.spring_home),
            ("max_speed", self.max_speed),
            ("drift", self.drift),
            ("initial_velocity", self.initial_velocity),
            ("link_radius", self.link_radius),
            ("link_opacity", self.link_opacity),
        ];
        for (name, value) in numbers {
            if !value.is_finite() {
                bail!("`{name}` must be a finite number, got: {value}");
            }
        }

        // Everything is finite from here on, so plain comparisons are enough.
        if self.area_per_particle <= 0.0 {
            bail!(
                "`area_per_particle` must be above 0, got: {}",
                self.area_per_particle
            );
        }
        if self.particle_min_size > self.particle_max_size {
            bail!(
                "`particle_min_size` ({}) can't be bigger than `particle_max_size` ({})",
                self.particle_min_size,
                self.particle_max_size
            );
        }
        if self.drift < 0.0 {
            bail!("`drift` can't be negative, got: {}", self.drift);
        }
        if self.initial_velocity < 0.0 {
            bail!(
                "`initial_velocity` can't be negative, got: {}",
                self.initial_velocity
            );
        }
        if self.max_speed < 0.0 {
            bail!("`max_speed` can't be negative, got: {}", self.max_speed);
        }

        Ok(())
    }
}

impl Config {
    /// Get the stable location of our config directory on the user's system.
    pub fn default_directory() -> Result<std::path::PathBuf> {
        Ok(dirs::config_dir()
            .context("Couldn't get standard config directory")?
            .join(CONFIG_DIRECTORY_NAME))
    }

    /// Load the config from the given path, or from the default location. The shipped default
    /// config is written to the default location if there isn't one there yet.
    pub fn load(maybe_custom_path: Option<std::path::PathBuf>) -> Result<Self> {
        let path = match maybe_custom_path {
            Some(path) => path,
            None => {
                let directory = Self::default_directory()?;
                std::fs::create_dir_all(&directory)?;
                let path = directory.join(DEFAULT_CONFIG_FILE_NAME);
                if !path.exists() {
                    std::fs::write(&path, DEFAULT_CONFIG)?;
                }
                path
            }
        };

        let data = match std::fs::read_to_string(&path) {
            Ok(data) => data,
            Err(error) => bail!("Couldn't load config at {}: {error}", path.display()),
        };

        Self::parse(&data)
            .map_err(|error| eyre!("Bad config file: {error}\n\nConfig path: {}", path.display()))
    }

    /// Parse and validate the contents of a config file.
    pub fn parse(data: &str) -> Result<Self> {
        let config = toml::from_str::<Self>(data)?;
        if config.frame_rate == 0 {
            bail!("`frame_rate` must be above 0");
        }
        config.field.validate()?;
        Ok(config)
    }
}
