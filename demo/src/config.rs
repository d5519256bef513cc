use dotenv::var;
use hd44780_gpio::expander;
use hd44780_gpio::lcd::hd44780::driver::Font;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Mode {
    Gpio,
    I2c,
}

/// Display wiring, read from the environment.
#[derive(Debug)]
pub struct Config {
    pub chip: String,
    pub mode: Mode,
    pub rows: u8,
    pub columns: u8,
    pub font: Font,
    pub pins: Vec<usize>,
    pub pin_backlight: Option<usize>,
    /// I2C character device, e.g. `/dev/i2c-1`.
    pub i2c_bus: String,
    pub i2c_address: u8,
    /// Stop counting after this many seconds. Counts forever if unset.
    pub seconds: Option<u64>,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let mode = parse_mode(&var_or("LCD_MODE", "gpio"))?;

        let (pins, pin_backlight) = match mode {
            Mode::Gpio => (
                parse_pin_list(&var("LCD_PINS")?)?,
                var("LCD_PIN_BACKLIGHT").ok().map(|s| s.trim().parse::<usize>()).transpose()?,
            ),
            Mode::I2c => (Vec::new(), None),
        };

        Ok(Config {
            chip: var_or("LCD_GPIO_CHIP", "/dev/gpiochip0"),
            mode,
            rows: var_or("LCD_ROWS", "2").trim().parse::<u8>()?,
            columns: var_or("LCD_COLS", "16").trim().parse::<u8>()?,
            font: parse_font(&var_or("LCD_FONT", "5x8"))?,
            pins,
            pin_backlight,
            i2c_bus: var_or("LCD_I2C_BUS", "/dev/i2c-1"),
            i2c_address: var("LCD_I2C_ADDRESS")
                .ok()
                .map(|s| parse_address(&s))
                .transpose()?
                .unwrap_or(expander::DEFAULT_ADDRESS),
            seconds: var("LCD_DEMO_SECONDS").ok().map(|s| s.trim().parse::<u64>()).transpose()?,
        })
    }
}

fn var_or(name: &str, default: &str) -> String {
    var(name).unwrap_or_else(|_| default.to_string())
}

pub fn parse_mode(s: &str) -> eyre::Result<Mode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "gpio" => Ok(Mode::Gpio),
        "i2c" => Ok(Mode::I2c),
        other => Err(eyre::eyre!("Unknown LCD mode: {}", other)),
    }
}

pub fn parse_font(s: &str) -> eyre::Result<Font> {
    match s.trim().to_ascii_lowercase().as_str() {
        "5x8" => Ok(Font::Font5x8),
        "5x10" => Ok(Font::Font5x10),
        other => Err(eyre::eyre!("Unknown font: {}", other)),
    }
}

/// Parses line numbers separated by commas, semicolons or spaces.
pub fn parse_pin_list(pin_str: &str) -> eyre::Result<Vec<usize>> {
    let pins = pin_str
        .split([',', ' ', ';'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>())
        .collect::<Result<Vec<_>, _>>()?;

    match pins.len() {
        7 | 11 => Ok(pins),
        n => Err(eyre::eyre!("Invalid number of LCD pins: {} (expected 7 or 11)", n)),
    }
}

/// Parses a decimal or `0x`-prefixed hexadecimal address.
pub fn parse_address(s: &str) -> eyre::Result<u8> {
    let s = s.trim();
    let address = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16)?,
        None => s.parse()?,
    };
    Ok(address)
}
