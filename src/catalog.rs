/* Parser and lookup for .device catalog files: maps usb:vid:pid patterns to a driver
 * name, the ordered endpoint-role list, and per-driver hardware constants. */
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use configparser::ini::Ini;
use tracing::{debug, warn};

/* Bus identifier used in `.device` match patterns and catalog keys. */
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BusType {
    Usb,
    Other(String),
}

impl BusType {
    pub fn from_str(s: &str) -> Self {
        match s {
            "usb" => BusType::Usb,
            other => BusType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for BusType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BusType::Usb => f.write_str("usb"),
            BusType::Other(s) => f.write_str(s),
        }
    }
}

/* A parsed `.device` file entry describing a supported tool. */
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub name: String,
    pub driver: String,
    pub matches: Vec<DeviceMatch>,
    /* Role tags in endpoint order; position i names the role of the
     * device's i-th serial endpoint. */
    pub endpoint_roles: Vec<String>,
    pub constants: DriverConstants,
}

/* One `bus:vvvv:pppp` pattern from the `DeviceMatch=` field. */
#[derive(Debug, Clone)]
pub struct DeviceMatch {
    pub bustype: BusType,
    pub vid: u16,
    pub pid: u16,
}

impl DeviceMatch {
    fn parse(pattern: &str) -> Result<DeviceMatch, String> {
        let mut fields = pattern.split(':');
        let bus = fields.next().unwrap_or_default();
        let (Some(vid), Some(pid), None) = (fields.next(), fields.next(), fields.next()) else {
            return Err(format!("match pattern '{pattern}' is not bus:vid:pid"));
        };

        Ok(DeviceMatch {
            bustype: BusType::from_str(bus),
            vid: u16::from_str_radix(vid, 16)
                .map_err(|e| format!("bad vendor id in '{pattern}': {e}"))?,
            pid: u16::from_str_radix(pid, 16)
                .map_err(|e| format!("bad product id in '{pattern}': {e}"))?,
        })
    }

    fn key(&self) -> (BusType, u16, u16) {
        (self.bustype.clone(), self.vid, self.pid)
    }
}

/* Hardware constants from the `[Driver/xxx]` section. */
#[derive(Debug, Clone)]
pub struct DriverConstants {
    /* Logic-analyzer base clock (SUMP divider math). */
    pub base_clock_hz: u32,
    /* Glitch engine clock period in picoseconds (8.3 ns = 8300). */
    pub clock_period_ps: u64,
    /* Console endpoint baud rate. */
    pub console_baud: u32,
    /* Binary/API endpoint baud rate. */
    pub binary_baud: u32,
    /* OpenOCD telnet command port; devices sharing a host need
     * non-overlapping numbers. */
    pub telnet_port: u16,
}

impl Default for DriverConstants {
    fn default() -> Self {
        Self {
            base_clock_hz: 100_000_000,
            clock_period_ps: 8300,
            console_baud: 115_200,
            binary_baud: 115_200,
            telnet_port: 4444,
        }
    }
}

/* Catalog: maps `(bustype, vid, pid)` to an entry. Entries are
 * reference-counted so devices with multiple match patterns share a
 * single allocation. */
pub type Catalog = HashMap<(BusType, u16, u16), Arc<CatalogEntry>>;

/* Load every `.device` file under `data_dir` into a lookup table.
 * Unparseable files are skipped with a warning; they never abort the
 * load. */
pub fn load_catalog(data_dir: &Path) -> Catalog {
    let mut catalog = Catalog::new();

    let Ok(dir) = std::fs::read_dir(data_dir) else {
        warn!("Catalog directory {:?} is not readable", data_dir);
        return catalog;
    };

    let device_files = dir
        .flatten()
        .map(|dirent| dirent.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "device"));

    for path in device_files {
        let entry = match parse_device_file(&path) {
            Ok(entry) => Arc::new(entry),
            Err(err) => {
                warn!("Skipping {:?}: {}", path, err);
                continue;
            }
        };
        for m in &entry.matches {
            catalog.insert(m.key(), Arc::clone(&entry));
        }
        debug!(
            "Catalog: '{}' handled by the {} driver ({} pattern(s))",
            entry.name,
            entry.driver,
            entry.matches.len()
        );
    }

    debug!("{} catalog entries loaded", catalog.len());
    catalog
}

/* Look up the entry for a vendor/product pair on USB. */
pub fn lookup(catalog: &Catalog, vid: u16, pid: u16) -> Option<Arc<CatalogEntry>> {
    catalog.get(&(BusType::Usb, vid, pid)).cloned()
}

/* Parse one `.device` INI file into a `CatalogEntry`. */
fn parse_device_file(path: &Path) -> Result<CatalogEntry, String> {
    let mut ini = Ini::new();
    ini.load(path).map_err(|e| format!("INI parse error: {}", e))?;

    /* The [Device] section must name the tool, its driver, and at
     * least one match pattern; the endpoint-role list may be empty
     * (in-process probes expose no serial endpoints). */
    let name = ini.get("device", "name").ok_or("[Device] lacks Name")?;
    let driver = ini.get("device", "driver").ok_or("[Device] lacks Driver")?;
    let match_str = ini
        .get("device", "devicematch")
        .ok_or("[Device] lacks DeviceMatch")?;

    let matches: Vec<DeviceMatch> = match_str
        .split(';')
        .map(str::trim)
        .filter(|pattern| !pattern.is_empty())
        .map(DeviceMatch::parse)
        .collect::<Result<_, _>>()?;
    if matches.is_empty() {
        return Err("DeviceMatch lists no patterns".to_string());
    }

    let endpoint_roles = ini
        .get("device", "endpoints")
        .map(|s| {
            s.split(';')
                .map(str::trim)
                .filter(|role| !role.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    /* [Driver/xxx] section, optional per field */
    let section = format!("driver/{}", driver);
    let constants = parse_driver_constants(&ini, &section);

    Ok(CatalogEntry {
        name,
        driver,
        matches,
        endpoint_roles,
        constants,
    })
}

/* Parse the `[Driver/xxx]` section, falling back to defaults per field. */
fn parse_driver_constants(ini: &Ini, section: &str) -> DriverConstants {
    let defaults = DriverConstants::default();

    DriverConstants {
        base_clock_hz: ini
            .get(section, "baseclock")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.base_clock_hz),
        clock_period_ps: ini
            .get(section, "clockperiodps")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.clock_period_ps),
        console_baud: ini
            .get(section, "consolebaud")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.console_baud),
        binary_baud: ini
            .get(section, "binarybaud")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.binary_baud),
        telnet_port: ini
            .get(section, "telnetport")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.telnet_port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_parse_usb() {
        let m = DeviceMatch::parse("usb:1209:7331").unwrap();
        assert_eq!(m.bustype, BusType::Usb);
        assert_eq!(m.vid, 0x1209);
        assert_eq!(m.pid, 0x7331);
    }

    #[test]
    fn test_match_parse_other_bus() {
        let m = DeviceMatch::parse("pci:cafe:0001").unwrap();
        assert_eq!(m.bustype, BusType::Other("pci".into()));
    }

    #[test]
    fn test_match_parse_wrong_field_count() {
        assert!(DeviceMatch::parse("usb:1209").is_err());
        assert!(DeviceMatch::parse("usb:1209:7331:extra").is_err());
        assert!(DeviceMatch::parse("").is_err());
    }

    #[test]
    fn test_match_parse_bad_hex() {
        assert!(DeviceMatch::parse("usb:zzzz:7331").is_err());
        assert!(DeviceMatch::parse("usb:1209:zzzz").is_err());
    }

    #[test]
    fn test_driver_constants_defaults() {
        let c = DriverConstants::default();
        assert_eq!(c.clock_period_ps, 8300);
        assert_eq!(c.telnet_port, 4444);
    }

    #[test]
    fn test_parse_device_file_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bolt.device");
        std::fs::write(
            &path,
            "[Device]\n\
             Name=Curious Bolt\n\
             Driver=bolt\n\
             DeviceMatch=usb:cafe:4005\n\
             Endpoints=sump;api\n\
             \n\
             [Driver/bolt]\n\
             BaseClock=120000000\n\
             ClockPeriodPs=8300\n",
        )
        .unwrap();

        let entry = parse_device_file(&path).unwrap();
        assert_eq!(entry.name, "Curious Bolt");
        assert_eq!(entry.driver, "bolt");
        assert_eq!(entry.endpoint_roles, vec!["sump", "api"]);
        assert_eq!(entry.constants.base_clock_hz, 120_000_000);
        /* Unset fields keep their defaults */
        assert_eq!(entry.constants.telnet_port, 4444);
    }

    #[test]
    fn test_parse_device_file_multiple_matches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("multi.device");
        std::fs::write(
            &path,
            "[Device]\n\
             Name=Multi\n\
             Driver=mock\n\
             DeviceMatch=usb:0403:6010; usb:0403:6011 ;\n",
        )
        .unwrap();

        let entry = parse_device_file(&path).unwrap();
        assert_eq!(entry.matches.len(), 2);
        assert_eq!(entry.matches[1].pid, 0x6011);
        /* No Endpoints= line: empty role list */
        assert!(entry.endpoint_roles.is_empty());
    }

    #[test]
    fn test_parse_device_file_empty_match_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.device");
        std::fs::write(
            &path,
            "[Device]\nName=Empty\nDriver=mock\nDeviceMatch=;\n",
        )
        .unwrap();
        assert!(parse_device_file(&path).is_err());
    }

    #[test]
    fn test_parse_device_file_missing_driver() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nodriver.device");
        std::fs::write(&path, "[Device]\nName=X\nDeviceMatch=usb:1:2\n").unwrap();
        assert!(parse_device_file(&path).is_err());
    }

    #[test]
    fn test_load_catalog_and_lookup() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("buspirate.device"),
            "[Device]\n\
             Name=Bus Pirate 5\n\
             Driver=buspirate\n\
             DeviceMatch=usb:1209:7331;usb:1209:7332\n\
             Endpoints=console;binary\n\
             \n\
             [Driver/buspirate]\n\
             BaseClock=62500000\n\
             BinaryBaud=3000000\n",
        )
        .unwrap();
        /* Non-.device files are ignored */
        std::fs::write(dir.path().join("README"), "not a device file").unwrap();
        /* A broken file is skipped, not fatal */
        std::fs::write(dir.path().join("broken.device"), "[Device]\nName=Broken\n").unwrap();

        let catalog = load_catalog(dir.path());
        assert_eq!(catalog.len(), 2);

        let entry = lookup(&catalog, 0x1209, 0x7332).unwrap();
        assert_eq!(entry.driver, "buspirate");
        assert_eq!(entry.constants.binary_baud, 3_000_000);
        assert!(lookup(&catalog, 0xdead, 0xbeef).is_none());
    }
}
