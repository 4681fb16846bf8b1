//! Static capability table for known vendor/product pairs.
//!
//! Lights report their vendor and product ids in a stateVersion reply; this
//! table maps those to a product name and the feature set the hardware
//! supports. Unknown pairs yield `None` rather than an error so callers can
//! degrade gracefully when new hardware appears.

use serde::Serialize;

/// Feature flags a product supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductFeatures {
    pub hev: bool,
    pub color: bool,
    pub chain: bool,
    pub matrix: bool,
    pub relays: bool,
    pub buttons: bool,
    pub infrared: bool,
    pub multizone: bool,
    /// Supported color temperature range in kelvin (min, max).
    pub temperature_range: (u16, u16),
}

/// Vendor/product metadata resolved from the capability table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProductInfo {
    pub vendor_name: &'static str,
    pub product_name: &'static str,
    pub features: ProductFeatures,
}

const NONE: ProductFeatures = ProductFeatures {
    hev: false,
    color: false,
    chain: false,
    matrix: false,
    relays: false,
    buttons: false,
    infrared: false,
    multizone: false,
    temperature_range: (2500, 9000),
};

const COLOR: ProductFeatures = ProductFeatures {
    color: true,
    ..NONE
};

const WHITE: ProductFeatures = ProductFeatures {
    temperature_range: (2700, 6500),
    ..NONE
};

const COLOR_IR: ProductFeatures = ProductFeatures {
    infrared: true,
    ..COLOR
};

const MULTIZONE: ProductFeatures = ProductFeatures {
    multizone: true,
    ..COLOR
};

const MATRIX: ProductFeatures = ProductFeatures {
    matrix: true,
    ..COLOR
};

const CHAIN: ProductFeatures = ProductFeatures {
    chain: true,
    ..MATRIX
};

const RELAYS: ProductFeatures = ProductFeatures {
    relays: true,
    buttons: true,
    temperature_range: (0, 0),
    ..NONE
};

const HEV: ProductFeatures = ProductFeatures {
    hev: true,
    ..COLOR
};

const FIXED_2700: ProductFeatures = ProductFeatures {
    temperature_range: (2700, 2700),
    ..NONE
};

const FILAMENT_2100: ProductFeatures = ProductFeatures {
    temperature_range: (2100, 2100),
    ..NONE
};

const FILAMENT_2000: ProductFeatures = ProductFeatures {
    temperature_range: (2000, 2000),
    ..NONE
};

/// Look up the capability entry for a vendor/product pair.
///
/// Data follows the published LIFX products registry. Returns `None` when
/// the pair is unknown.
#[rustfmt::skip]
pub fn lookup(vendor: u32, product: u32) -> Option<&'static ProductInfo> {
    macro_rules! product {
        ($name:expr, $features:expr) => {
            &ProductInfo { vendor_name: "LIFX", product_name: $name, features: $features }
        };
    }
    let info: &'static ProductInfo = match (vendor, product) {
        (1, 1) => product!("LIFX Original 1000", COLOR),
        (1, 3) => product!("LIFX Color 650", COLOR),
        (1, 10) => product!("LIFX White 800 (Low Voltage)", WHITE),
        (1, 11) => product!("LIFX White 800 (High Voltage)", WHITE),
        (1, 15) => product!("LIFX Color 1000", COLOR),
        (1, 18) => product!("LIFX White 900 BR30 (Low Voltage)", WHITE),
        (1, 20) => product!("LIFX Color 1000 BR30", COLOR),
        (1, 22) => product!("LIFX Color 1000", COLOR),
        (1, 27) => product!("LIFX A19", COLOR),
        (1, 28) => product!("LIFX BR30", COLOR),
        (1, 29) => product!("LIFX A19 Night Vision", COLOR_IR),
        (1, 30) => product!("LIFX BR30 Night Vision", COLOR_IR),
        (1, 31) => product!("LIFX Z", MULTIZONE),
        (1, 32) => product!("LIFX Z", MULTIZONE),
        (1, 36) => product!("LIFX Downlight", COLOR),
        (1, 37) => product!("LIFX Downlight", COLOR),
        (1, 38) => product!("LIFX Beam", MULTIZONE),
        (1, 43) => product!("LIFX A19", COLOR),
        (1, 44) => product!("LIFX BR30", COLOR),
        (1, 45) => product!("LIFX A19 Night Vision", COLOR_IR),
        (1, 46) => product!("LIFX BR30 Night Vision", COLOR_IR),
        (1, 49) => product!("LIFX Mini Color", COLOR),
        (1, 50) => product!("LIFX Mini White to Warm", WHITE),
        (1, 51) => product!("LIFX Mini White", FIXED_2700),
        (1, 52) => product!("LIFX GU10", COLOR),
        (1, 55) => product!("LIFX Tile", CHAIN),
        (1, 57) => product!("LIFX Candle", MATRIX),
        (1, 59) => product!("LIFX Mini Color", COLOR),
        (1, 60) => product!("LIFX Mini White to Warm", WHITE),
        (1, 61) => product!("LIFX Mini White", FIXED_2700),
        (1, 68) => product!("LIFX Candle", MATRIX),
        (1, 70) => product!("LIFX Switch", RELAYS),
        (1, 71) => product!("LIFX Switch", RELAYS),
        (1, 81) => product!("LIFX Candle White to Warm", WHITE),
        (1, 82) => product!("LIFX Filament Clear", FILAMENT_2100),
        (1, 85) => product!("LIFX Filament Amber", FILAMENT_2000),
        (1, 89) => product!("LIFX Switch", RELAYS),
        (1, 90) => product!("LIFX Clean", HEV),
        (1, 91) => product!("LIFX Color", COLOR),
        (1, 92) => product!("LIFX Color", COLOR),
        (1, 94) => product!("LIFX BR30", COLOR),
        (1, 97) => product!("LIFX A19", COLOR),
        (1, 98) => product!("LIFX BR30", COLOR),
        (1, 99) => product!("LIFX Clean", HEV),
        (1, 109) => product!("LIFX A19 Night Vision", COLOR_IR),
        (1, 110) => product!("LIFX BR30 Night Vision", COLOR_IR),
        (1, 111) => product!("LIFX A19 Night Vision", COLOR_IR),
        (1, 112) => product!("LIFX BR30 Night Vision Intl", COLOR_IR),
        (1, 113) => product!("LIFX Mini White to Warm", WHITE),
        (1, 114) => product!("LIFX Mini White to Warm", WHITE),
        (_, _) => return None,
    };
    Some(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_products() {
        let tile = lookup(1, 55).unwrap();
        assert_eq!(tile.product_name, "LIFX Tile");
        assert!(tile.features.chain);
        assert!(tile.features.matrix);
        assert!(!tile.features.multizone);

        let strip = lookup(1, 32).unwrap();
        assert!(strip.features.multizone);
        assert!(strip.features.color);

        let switch = lookup(1, 70).unwrap();
        assert!(switch.features.relays);
        assert!(!switch.features.color);
    }

    #[test]
    fn test_lookup_unknown_returns_none() {
        assert!(lookup(1, 9999).is_none());
        assert!(lookup(2, 1).is_none());
    }

    #[test]
    fn test_white_products_have_no_color() {
        let white = lookup(1, 51).unwrap();
        assert!(!white.features.color);
        assert_eq!(white.features.temperature_range, (2700, 2700));
    }
}
