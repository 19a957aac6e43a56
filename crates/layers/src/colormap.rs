//! Scalar-to-color mapping.
//!
//! - continuous scales (d3-style names such as `interpolateViridis`) sampled
//!   by piecewise-linear interpolation between sRGB stops; the perceptual
//!   scales carry all 256 entries, so a 256-entry table reproduces them
//!   exactly
//! - literal colors: `#rgb`, `#rrggbb`, `rgb(r, g, b)` and CSS color names
//!
//! Sampled channels are rounded to 8 bits before normalizing to `[0, 1]`, so
//! a lookup table and a direct sample of the same value agree exactly.

/// RGB triple with components in `[0, 1]`.
pub type Rgb = [f32; 3];

/// Default lookup-table size uploaded for GPU-side color lookups.
pub const DEFAULT_LUT_RESOLUTION: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum ColorError {
    UnknownColorScale(String),
    InvalidValue(f64),
}

impl std::fmt::Display for ColorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorError::UnknownColorScale(name) => {
                write!(f, "color scale or color does not exist: {name}")
            }
            ColorError::InvalidValue(v) => write!(f, "color scale value is not finite: {v}"),
        }
    }
}

impl std::error::Error for ColorError {}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ColorScale {
    Viridis,
    Magma,
    Inferno,
    Plasma,
    Reds,
    Blues,
    Greens,
    Greys,
    Oranges,
    Purples,
}

/// Decode 256 packed `rrggbb` entries.
const fn ramp(hex: &str) -> [[u8; 3]; 256] {
    const fn nibble(h: u8) -> u8 {
        match h {
            b'0'..=b'9' => h - b'0',
            b'a'..=b'f' => h - b'a' + 10,
            _ => panic!("ramp entries must be lowercase hex"),
        }
    }
    let bytes = hex.as_bytes();
    assert!(bytes.len() == 256 * 6, "ramp must hold 256 entries");
    let mut out = [[0u8; 3]; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = 0;
        while c < 3 {
            let at = i * 6 + c * 2;
            out[i][c] = (nibble(bytes[at]) << 4) | nibble(bytes[at + 1]);
            c += 1;
        }
        i += 1;
    }
    out
}

// Perceptual scales: the full 256-entry ramps.
const VIRIDIS_RAMP: [[u8; 3]; 256] = ramp(concat!(
    "44015444025645045745055946075a46085c460a5d460b5e470d60470e61471063471164471365481467481668481769",
    "48186a481a6c481b6d481c6e481d6f481f70482071482173482374482475482576482677482878482979472a7a472c7a",
    "472d7b472e7c472f7d46307e46327e46337f463480453581453781453882443983443a83443b84433d84433e85423f85",
    "4240864241864142874144874045884046883f47883f48893e49893e4a893e4c8a3d4d8a3d4e8a3c4f8a3c508b3b518b",
    "3b528b3a538b3a548c39558c39568c38588c38598c375a8c375b8d365c8d365d8d355e8d355f8d34608d34618d33628d",
    "33638d32648e32658e31668e31678e31688e30698e306a8e2f6b8e2f6c8e2e6d8e2e6e8e2e6f8e2d708e2d718e2c718e",
    "2c728e2c738e2b748e2b758e2a768e2a778e2a788e29798e297a8e297b8e287c8e287d8e277e8e277f8e27808e26818e",
    "26828e26828e25838e25848e25858e24868e24878e23888e23898e238a8d228b8d228c8d228d8d218e8d218f8d21908d",
    "21918c20928c20928c20938c1f948c1f958b1f968b1f978b1f988b1f998a1f9a8a1e9b8a1e9c891e9d891f9e891f9f88",
    "1fa0881fa1881fa1871fa28720a38620a48621a58521a68522a78522a88423a98324aa8325ab8225ac8226ad8127ad81",
    "28ae8029af7f2ab07f2cb17e2db27d2eb37c2fb47c31b57b32b67a34b67935b77937b87838b9773aba763bbb753dbc74",
    "3fbc7340bd7242be7144bf7046c06f48c16e4ac16d4cc26c4ec36b50c46a52c56954c56856c66758c7655ac8645cc863",
    "5ec96260ca6063cb5f65cb5e67cc5c69cd5b6ccd5a6ece5870cf5773d05675d05477d1537ad1517cd2507fd34e81d34d",
    "84d44b86d54989d5488bd6468ed64590d74393d74195d84098d83e9bd93c9dd93ba0da39a2da37a5db36a8db34aadc32",
    "addc30b0dd2fb2dd2db5de2bb8de29bade28bddf26c0df25c2df23c5e021c8e020cae11fcde11dd0e11cd2e21bd5e21a",
    "d8e219dae319dde318dfe318e2e418e5e419e7e419eae51aece51befe51cf1e51df4e61ef6e620f8e621fbe723fde725",
));
const VIRIDIS: &[[u8; 3]] = &VIRIDIS_RAMP;

const MAGMA_RAMP: [[u8; 3]; 256] = ramp(concat!(
    "00000401000501010601010802010902020b02020d03030f03031204041405041606051806051a07061c08071e090720",
    "0a08220b09240c09260d0a290e0b2b100b2d110c2f120d31130d34140e36150e38160f3b180f3d19103f1a10421c1044",
    "1d11471e114920114b21114e22115024125325125527125829115a2a115c2c115f2d11612f1163311165331067341069",
    "36106b38106c390f6e3b0f703d0f713f0f72400f74420f75440f764510774710784910784a10794c117a4e117b4f127b",
    "51127c52137c54137d56147d57157e59157e5a167e5c167f5d177f5f187f601880621980641a80651a80671b80681c81",
    "6a1c816b1d816d1d816e1e81701f81721f817320817521817621817822817922827b23827c23827e2482802582812581",
    "8326818426818627818827818928818b29818c29818e2a81902a81912b81932b80942c80962c80982d80992d809b2e7f",
    "9c2e7f9e2f7fa02f7fa1307ea3307ea5317ea6317da8327daa337dab337cad347cae347bb0357bb2357bb3367ab5367a",
    "b73779b83779ba3878bc3978bd3977bf3a77c03a76c23b75c43c75c53c74c73d73c83e73ca3e72cc3f71cd4071cf4070",
    "d0416fd2426fd3436ed5446dd6456cd8456cd9466bdb476adc4869de4968df4a68e04c67e24d66e34e65e44f64e55064",
    "e75263e85362e95462ea5661eb5760ec5860ed5a5fee5b5eef5d5ef05f5ef1605df2625df2645cf3655cf4675cf4695c",
    "f56b5cf66c5cf66e5cf7705cf7725cf8745cf8765cf9785df9795df97b5dfa7d5efa7f5efa815ffb835ffb8560fb8761",
    "fc8961fc8a62fc8c63fc8e64fc9065fd9266fd9467fd9668fd9869fd9a6afd9b6bfe9d6cfe9f6dfea16efea36ffea571",
    "fea772fea973feaa74feac76feae77feb078feb27afeb47bfeb67cfeb77efeb97ffebb81febd82febf84fec185fec287",
    "fec488fec68afec88cfeca8dfecc8ffecd90fecf92fed194fed395fed597fed799fed89afdda9cfddc9efddea0fde0a1",
    "fde2a3fde3a5fde5a7fde7a9fde9aafdebacfcecaefceeb0fcf0b2fcf2b4fcf4b6fcf6b8fcf7b9fcf9bbfcfbbdfcfdbf",
));
const MAGMA: &[[u8; 3]] = &MAGMA_RAMP;

const INFERNO_RAMP: [[u8; 3]; 256] = ramp(concat!(
    "00000401000501010601010802010a02020c02020e03021004031204031405041706041907051b08051d09061f0a0722",
    "0b07240c08260d08290e092b10092d110a30120a32140b34150b37160b39180c3c190c3e1b0c411c0c431e0c451f0c48",
    "210c4a230c4c240c4f260c51280b53290b552b0b572d0b592f0a5b310a5c320a5e340a5f3609613809623909633b0964",
    "3d09653e0966400a67420a68440a68450a69470b6a490b6a4a0c6b4c0c6b4d0d6c4f0d6c510e6c520e6d540f6d550f6d",
    "57106e59106e5a116e5c126e5d126e5f136e61136e62146e64156e65156e67166e69166e6a176e6c186e6d186e6f196e",
    "71196e721a6e741a6e751b6e771c6d781c6d7a1d6d7c1d6d7d1e6d7f1e6c801f6c82206c84206b85216b87216b88226a",
    "8a226a8c23698d23698f24699025689225689326679526679727669827669a28659b29649d29649f2a63a02a63a22b62",
    "a32c61a52c60a62d60a82e5fa92e5eab2f5ead305dae305cb0315bb1325ab3325ab43359b63458b73557b93556ba3655",
    "bc3754bd3853bf3952c03a51c13a50c33b4fc43c4ec63d4dc73e4cc83f4bca404acb4149cc4248ce4347cf4446d04545",
    "d24644d34743d44842d54a41d74b3fd84c3ed94d3dda4e3cdb503bdd513ade5238df5337e05536e15635e25734e35933",
    "e45a31e55c30e65d2fe75e2ee8602de9612bea632aeb6429eb6628ec6726ed6925ee6a24ef6c23ef6e21f06f20f1711f",
    "f1731df2741cf3761bf37819f47918f57b17f57d15f67e14f68013f78212f78410f8850ff8870ef8890cf98b0bf98c0a",
    "f98e09fa9008fa9207fa9407fb9606fb9706fb9906fb9b06fb9d07fc9f07fca108fca309fca50afca60cfca80dfcaa0f",
    "fcac11fcae12fcb014fcb216fcb418fbb61afbb81dfbba1ffbbc21fbbe23fac026fac228fac42afac62df9c72ff9c932",
    "f9cb35f8cd37f8cf3af7d13df7d340f6d543f6d746f5d949f5db4cf4dd4ff4df53f4e156f3e35af3e55df2e661f2e865",
    "f2ea69f1ec6df1ed71f1ef75f1f179f2f27df2f482f3f586f3f68af4f88ef5f992f6fa96f8fb9af9fc9dfafda1fcffa4",
));
const INFERNO: &[[u8; 3]] = &INFERNO_RAMP;

const PLASMA_RAMP: [[u8; 3]; 256] = ramp(concat!(
    "0d088710078813078916078a19068c1b068d1d068e20068f2206902406912605912805922a05932c05942e05952f0596",
    "31059733059735049837049938049a3a049a3c049b3e049c3f049c41049d43039e44039e46039f48039f4903a04b03a1",
    "4c02a14e02a25002a25102a35302a35502a45601a45801a45901a55b01a55c01a65e01a66001a66100a76300a76400a7",
    "6600a76700a86900a86a00a86c00a86e00a86f00a87100a87201a87401a87501a87701a87801a87a02a87b02a87d03a8",
    "7e03a88004a88104a78305a78405a78606a68707a68808a68a09a58b0aa58d0ba58e0ca48f0da4910ea3920fa39410a2",
    "9511a19613a19814a099159f9a169f9c179e9d189d9e199da01a9ca11b9ba21d9aa31e9aa51f99a62098a72197a82296",
    "aa2395ab2494ac2694ad2793ae2892b02991b12a90b22b8fb32c8eb42e8db52f8cb6308bb7318ab83289ba3388bb3488",
    "bc3587bd3786be3885bf3984c03a83c13b82c23c81c33d80c43e7fc5407ec6417dc7427cc8437bc9447aca457acb4679",
    "cc4778cc4977cd4a76ce4b75cf4c74d04d73d14e72d24f71d35171d45270d5536fd5546ed6556dd7566cd8576bd9586a",
    "da5a6ada5b69db5c68dc5d67dd5e66de5f65de6164df6263e06363e16462e26561e26660e3685fe4695ee56a5de56b5d",
    "e66c5ce76e5be76f5ae87059e97158e97257ea7457eb7556eb7655ec7754ed7953ed7a52ee7b51ef7c51ef7e50f07f4f",
    "f0804ef1814df1834cf2844bf3854bf3874af48849f48948f58b47f58c46f68d45f68f44f79044f79143f79342f89441",
    "f89540f9973ff9983ef99a3efa9b3dfa9c3cfa9e3bfb9f3afba139fba238fca338fca537fca636fca835fca934fdab33",
    "fdac33fdae32fdaf31fdb130fdb22ffdb42ffdb52efeb72dfeb82cfeba2cfebb2bfebd2afebe2afec029fdc229fdc328",
    "fdc527fdc627fdc827fdca26fdcb26fccd25fcce25fcd025fcd225fbd324fbd524fbd724fad824fada24f9dc24f9dd25",
    "f8df25f8e125f7e225f7e425f6e626f6e826f5e926f5eb27f4ed27f3ee27f3f027f2f227f1f426f1f525f0f724f0f921",
));
const PLASMA: &[[u8; 3]] = &PLASMA_RAMP;

// Sequential scales: nine stops.
const REDS: &[[u8; 3]] = &[
    [0xff, 0xf5, 0xf0],
    [0xfe, 0xe0, 0xd2],
    [0xfc, 0xbb, 0xa1],
    [0xfc, 0x92, 0x72],
    [0xfb, 0x6a, 0x4a],
    [0xef, 0x3b, 0x2c],
    [0xcb, 0x18, 0x1d],
    [0xa5, 0x0f, 0x15],
    [0x67, 0x00, 0x0d],
];

const BLUES: &[[u8; 3]] = &[
    [0xf7, 0xfb, 0xff],
    [0xde, 0xeb, 0xf7],
    [0xc6, 0xdb, 0xef],
    [0x9e, 0xca, 0xe1],
    [0x6b, 0xae, 0xd6],
    [0x42, 0x92, 0xc6],
    [0x21, 0x71, 0xb5],
    [0x08, 0x51, 0x9c],
    [0x08, 0x30, 0x6b],
];

const GREENS: &[[u8; 3]] = &[
    [0xf7, 0xfc, 0xf5],
    [0xe5, 0xf5, 0xe0],
    [0xc7, 0xe9, 0xc0],
    [0xa1, 0xd9, 0x9b],
    [0x74, 0xc4, 0x76],
    [0x41, 0xab, 0x5d],
    [0x23, 0x8b, 0x45],
    [0x00, 0x6d, 0x2c],
    [0x00, 0x44, 0x1b],
];

const GREYS: &[[u8; 3]] = &[
    [0xff, 0xff, 0xff],
    [0xf0, 0xf0, 0xf0],
    [0xd9, 0xd9, 0xd9],
    [0xbd, 0xbd, 0xbd],
    [0x96, 0x96, 0x96],
    [0x73, 0x73, 0x73],
    [0x52, 0x52, 0x52],
    [0x25, 0x25, 0x25],
    [0x00, 0x00, 0x00],
];

const ORANGES: &[[u8; 3]] = &[
    [0xff, 0xf5, 0xeb],
    [0xfe, 0xe6, 0xce],
    [0xfd, 0xd0, 0xa2],
    [0xfd, 0xae, 0x6b],
    [0xfd, 0x8d, 0x3c],
    [0xf1, 0x69, 0x13],
    [0xd9, 0x48, 0x01],
    [0xa6, 0x36, 0x03],
    [0x7f, 0x27, 0x04],
];

const PURPLES: &[[u8; 3]] = &[
    [0xfc, 0xfb, 0xfd],
    [0xef, 0xed, 0xf5],
    [0xda, 0xda, 0xeb],
    [0xbc, 0xbd, 0xdc],
    [0x9e, 0x9a, 0xc8],
    [0x80, 0x7d, 0xba],
    [0x6a, 0x51, 0xa3],
    [0x54, 0x27, 0x8f],
    [0x3f, 0x00, 0x7d],
];

impl ColorScale {
    pub const ALL: [ColorScale; 10] = [
        ColorScale::Viridis,
        ColorScale::Magma,
        ColorScale::Inferno,
        ColorScale::Plasma,
        ColorScale::Reds,
        ColorScale::Blues,
        ColorScale::Greens,
        ColorScale::Greys,
        ColorScale::Oranges,
        ColorScale::Purples,
    ];

    /// Resolve `interpolateViridis`, `Viridis` or `viridis`.
    pub fn from_name(name: &str) -> Option<Self> {
        let bare = name.strip_prefix("interpolate").unwrap_or(name);
        Self::ALL
            .into_iter()
            .find(|s| s.short_name().eq_ignore_ascii_case(bare))
    }

    pub fn short_name(self) -> &'static str {
        match self {
            ColorScale::Viridis => "Viridis",
            ColorScale::Magma => "Magma",
            ColorScale::Inferno => "Inferno",
            ColorScale::Plasma => "Plasma",
            ColorScale::Reds => "Reds",
            ColorScale::Blues => "Blues",
            ColorScale::Greens => "Greens",
            ColorScale::Greys => "Greys",
            ColorScale::Oranges => "Oranges",
            ColorScale::Purples => "Purples",
        }
    }

    fn stops(self) -> &'static [[u8; 3]] {
        match self {
            ColorScale::Viridis => VIRIDIS,
            ColorScale::Magma => MAGMA,
            ColorScale::Inferno => INFERNO,
            ColorScale::Plasma => PLASMA,
            ColorScale::Reds => REDS,
            ColorScale::Blues => BLUES,
            ColorScale::Greens => GREENS,
            ColorScale::Greys => GREYS,
            ColorScale::Oranges => ORANGES,
            ColorScale::Purples => PURPLES,
        }
    }

    /// Sample at `t` (clamped to `[0, 1]`) as 8-bit sRGB.
    pub fn sample_u8(self, t: f64) -> [u8; 3] {
        let stops = self.stops();
        let t = t.clamp(0.0, 1.0);
        let segs = (stops.len() - 1) as f64;
        let x = t * segs;
        let i = (x.floor() as usize).min(stops.len() - 2);
        let f = x - i as f64;
        let a = stops[i];
        let b = stops[i + 1];
        let lerp = |c0: u8, c1: u8| (c0 as f64 + f * (c1 as f64 - c0 as f64)).round() as u8;
        [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])]
    }

    pub fn sample(self, t: f64) -> Rgb {
        normalize_u8(self.sample_u8(t))
    }
}

/// What a color name resolved to.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum ColorSource {
    Scale(ColorScale),
    Literal([u8; 3]),
}

impl ColorSource {
    pub fn resolve(name: &str) -> Result<Self, ColorError> {
        if let Some(scale) = ColorScale::from_name(name) {
            return Ok(ColorSource::Scale(scale));
        }
        parse_color(name)
            .map(ColorSource::Literal)
            .ok_or_else(|| ColorError::UnknownColorScale(name.to_string()))
    }

    pub fn sample(self, value: f64) -> Result<Rgb, ColorError> {
        if !value.is_finite() {
            return Err(ColorError::InvalidValue(value));
        }
        Ok(match self {
            ColorSource::Scale(scale) => scale.sample(value),
            ColorSource::Literal(rgb) => normalize_u8(rgb),
        })
    }
}

/// Color of `value` under the scale or literal color named `color`.
pub fn get_color(value: f64, color: &str) -> Result<Rgb, ColorError> {
    ColorSource::resolve(color)?.sample(value)
}

/// Flat RGB lookup table of `resolution` evenly spaced samples of `color`.
pub fn get_color_map(color: &str, resolution: usize) -> Result<Vec<f32>, ColorError> {
    Ok(ColorLut::build(color, resolution)?.into_flat())
}

/// Sampled color table, the host-side image of the 1-D color texture.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorLut {
    entries: Vec<Rgb>,
}

impl ColorLut {
    pub fn build(color: &str, resolution: usize) -> Result<Self, ColorError> {
        let source = ColorSource::resolve(color)?;
        let mut entries = Vec::with_capacity(resolution);
        for id in 0..resolution {
            let t = if resolution > 1 {
                id as f64 / (resolution - 1) as f64
            } else {
                0.0
            };
            entries.push(source.sample(t)?);
        }
        Ok(Self { entries })
    }

    /// Table with exactly `entries`, e.g. a categorical palette.
    pub fn from_entries(entries: Vec<Rgb>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[Rgb] {
        &self.entries
    }

    /// Nearest-texel lookup for `t` in `[0, 1]`.
    pub fn lookup(&self, t: f64) -> Option<Rgb> {
        if self.entries.is_empty() || !t.is_finite() {
            return None;
        }
        let last = self.entries.len() - 1;
        let i = (t.clamp(0.0, 1.0) * last as f64).round() as usize;
        self.entries.get(i.min(last)).copied()
    }

    pub fn into_flat(self) -> Vec<f32> {
        self.entries.into_iter().flatten().collect()
    }
}

/// Parse a literal color. Returns `None` for anything unrecognized.
pub fn parse_color(s: &str) -> Option<[u8; 3]> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix('#') {
        return parse_hex(hex);
    }
    if let Some(body) = s
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            return None;
        }
        let mut out = [0u8; 3];
        for (slot, part) in out.iter_mut().zip(&parts) {
            *slot = part.parse::<u8>().ok()?;
        }
        return Some(out);
    }
    let lower = s.to_ascii_lowercase();
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, rgb)| *rgb)
}

fn parse_hex(hex: &str) -> Option<[u8; 3]> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => {
            let mut out = [0u8; 3];
            for (slot, c) in out.iter_mut().zip(hex.chars()) {
                let d = c.to_digit(16)? as u8;
                *slot = d * 17;
            }
            Some(out)
        }
        6 => Some([
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        ]),
        _ => None,
    }
}

pub fn normalize_u8(rgb: [u8; 3]) -> Rgb {
    [
        rgb[0] as f32 / 255.0,
        rgb[1] as f32 / 255.0,
        rgb[2] as f32 / 255.0,
    ]
}

const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("lime", [0, 255, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("cyan", [0, 255, 255]),
    ("aqua", [0, 255, 255]),
    ("magenta", [255, 0, 255]),
    ("fuchsia", [255, 0, 255]),
    ("gray", [128, 128, 128]),
    ("grey", [128, 128, 128]),
    ("silver", [192, 192, 192]),
    ("lightgray", [211, 211, 211]),
    ("lightgrey", [211, 211, 211]),
    ("darkgray", [169, 169, 169]),
    ("darkgrey", [169, 169, 169]),
    ("maroon", [128, 0, 0]),
    ("olive", [128, 128, 0]),
    ("teal", [0, 128, 128]),
    ("navy", [0, 0, 128]),
    ("purple", [128, 0, 128]),
    ("orange", [255, 165, 0]),
    ("pink", [255, 192, 203]),
    ("brown", [165, 42, 42]),
    ("gold", [255, 215, 0]),
    ("steelblue", [70, 130, 180]),
    ("skyblue", [135, 206, 235]),
    ("tomato", [255, 99, 71]),
    ("crimson", [220, 20, 60]),
    ("coral", [255, 127, 80]),
    ("salmon", [250, 128, 114]),
    ("khaki", [240, 230, 140]),
    ("beige", [245, 245, 220]),
    ("ivory", [255, 255, 240]),
    ("indigo", [75, 0, 130]),
    ("violet", [238, 130, 238]),
    ("turquoise", [64, 224, 208]),
    ("forestgreen", [34, 139, 34]),
    ("darkgreen", [0, 100, 0]),
    ("darkblue", [0, 0, 139]),
    ("darkred", [139, 0, 0]),
];

#[cfg(test)]
mod tests {
    use super::{
        ColorError, ColorLut, ColorScale, ColorSource, get_color, get_color_map, parse_color,
    };

    fn lum(rgb: &[f32]) -> f32 {
        0.2126 * rgb[0] + 0.7152 * rgb[1] + 0.0722 * rgb[2]
    }

    #[test]
    fn viridis_table_has_reference_endpoints() {
        let lut = get_color_map("interpolateViridis", 256).unwrap();
        assert_eq!(lut.len(), 256 * 3);
        assert!(lut.iter().all(|c| (0.0..=1.0).contains(c)));

        assert_eq!(&lut[0..3], &[68.0 / 255.0, 1.0 / 255.0, 84.0 / 255.0]);
        assert_eq!(&lut[765..768], &[253.0 / 255.0, 231.0 / 255.0, 37.0 / 255.0]);
    }

    #[test]
    fn viridis_luminance_increases_along_the_table() {
        let lut = get_color_map("interpolateViridis", 256).unwrap();
        let l: Vec<f32> = lut.chunks_exact(3).map(lum).collect();
        for w in l.windows(2) {
            // Allow one 8-bit rounding step of slack between neighbours.
            assert!(w[1] >= w[0] - 1.0 / 255.0, "{} then {}", w[0], w[1]);
        }
        assert!(l[255] > l[0] + 0.5);
    }

    #[test]
    fn sequential_scales_darken() {
        for name in ["interpolateReds", "interpolateBlues", "interpolateGreys"] {
            let lo = get_color(0.0, name).unwrap();
            let hi = get_color(1.0, name).unwrap();
            assert!(lum(&hi) < lum(&lo), "{name}");
        }
    }

    #[test]
    fn values_are_clamped_and_nan_rejected() {
        assert_eq!(
            get_color(-3.0, "interpolateMagma").unwrap(),
            get_color(0.0, "interpolateMagma").unwrap()
        );
        assert!(matches!(
            get_color(f64::NAN, "interpolateMagma"),
            Err(ColorError::InvalidValue(v)) if v.is_nan()
        ));
    }

    #[test]
    fn literal_colors_parse() {
        assert_eq!(parse_color("#ffdd00"), Some([255, 221, 0]));
        assert_eq!(parse_color("#FD0"), Some([255, 221, 0]));
        assert_eq!(parse_color("rgb(1, 2, 3)"), Some([1, 2, 3]));
        assert_eq!(parse_color("SteelBlue"), Some([70, 130, 180]));
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("rgb(1, 2)"), None);

        assert_eq!(get_color(0.7, "white").unwrap(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn unknown_names_fail_fast() {
        assert_eq!(
            get_color(0.5, "interpolateNope").unwrap_err(),
            ColorError::UnknownColorScale("interpolateNope".to_string())
        );
        assert!(get_color_map("nope", 4).is_err());
    }

    #[test]
    fn scale_names_resolve_with_or_without_prefix() {
        assert_eq!(ColorScale::from_name("interpolateViridis"), Some(ColorScale::Viridis));
        assert_eq!(ColorScale::from_name("purples"), Some(ColorScale::Purples));
        assert_eq!(
            ColorSource::resolve("purple").unwrap(),
            ColorSource::Literal([128, 0, 128])
        );
    }

    #[test]
    fn lut_edge_resolutions() {
        assert!(ColorLut::build("interpolateReds", 0).unwrap().is_empty());
        let one = ColorLut::build("interpolateReds", 1).unwrap();
        assert_eq!(one.entries(), &[get_color(0.0, "interpolateReds").unwrap()]);
    }

    #[test]
    fn lut_lookup_matches_direct_samples_at_texels() {
        let lut = ColorLut::build("interpolatePlasma", 5).unwrap();
        for (i, t) in [0.0, 0.25, 0.5, 0.75, 1.0].into_iter().enumerate() {
            assert_eq!(lut.lookup(t), Some(lut.entries()[i]));
            assert_eq!(lut.lookup(t).unwrap(), get_color(t, "interpolatePlasma").unwrap());
        }
        assert!(lut.lookup(f64::NAN).is_none());
    }

    #[test]
    fn perceptual_tables_reproduce_every_ramp_entry() {
        let at = |name: &str, i: usize| {
            let lut = ColorLut::build(name, 256).unwrap();
            lut.entries()[i].map(|c| (c * 255.0).round() as u8)
        };
        assert_eq!(at("interpolateViridis", 128), [0x21, 0x91, 0x8c]);
        assert_eq!(at("interpolateViridis", 25), [0x48, 0x24, 0x75]);
        assert_eq!(at("interpolateMagma", 127), [0xb5, 0x36, 0x7a]);
        assert_eq!(at("interpolateInferno", 191), [0xf9, 0x8c, 0x0a]);
        assert_eq!(at("interpolatePlasma", 64), [0x7e, 0x03, 0xa8]);
        assert_eq!(at("interpolatePlasma", 255), [0xf0, 0xf9, 0x21]);
        assert_eq!(ColorScale::Viridis.sample_u8(128.0 / 255.0), [0x21, 0x91, 0x8c]);
    }
}
