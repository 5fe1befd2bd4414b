//! Static tag dictionary: human field names ↔ (directory, tag id, type).

use std::borrow::Cow;
use std::collections::HashMap;

use super::ifd::IfdKind;
use super::value::TagType;
use crate::error::{ExifError, Result};

// Structural tags, consumed by the reader and synthesized by the writer
pub const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
pub const TAG_GPS_IFD_POINTER: u16 = 0x8825;
pub const TAG_INTEROP_IFD_POINTER: u16 = 0xA005;
pub const TAG_JPEG_INTERCHANGE_FORMAT: u16 = 0x0201;
pub const TAG_JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 0x0202;

pub const TAG_USER_COMMENT: u16 = 0x9286;

// XP* tag IDs (IFD0), UTF-16LE text stored as BYTE
pub const TAG_XP_TITLE: u16 = 0x9C9B;
pub const TAG_XP_SUBJECT: u16 = 0x9C9F;

/// Whether `id` is one of the Windows `XP*` text tags.
pub fn is_xp_tag(id: u16) -> bool {
    (TAG_XP_TITLE..=TAG_XP_SUBJECT).contains(&id)
}

use TagType::{
    Ascii, Byte, Long, Rational, SRational, SShort, Short, Undefined,
};

/// Primary and thumbnail IFD tags, including the TIFF/EP aliases of
/// several Exif fields.
const IMAGE_TAGS: &[(u16, &str, TagType)] = &[
    (0x000B, "ProcessingSoftware", Ascii),
    (0x00FE, "NewSubfileType", Long),
    (0x00FF, "SubfileType", Short),
    (0x0100, "ImageWidth", Long),
    (0x0101, "ImageLength", Long),
    (0x0102, "BitsPerSample", Short),
    (0x0103, "Compression", Short),
    (0x0106, "PhotometricInterpretation", Short),
    (0x0107, "Threshholding", Short),
    (0x0108, "CellWidth", Short),
    (0x0109, "CellLength", Short),
    (0x010A, "FillOrder", Short),
    (0x010D, "DocumentName", Ascii),
    (0x010E, "ImageDescription", Ascii),
    (0x010F, "Make", Ascii),
    (0x0110, "Model", Ascii),
    (0x0111, "StripOffsets", Long),
    (0x0112, "Orientation", Short),
    (0x0115, "SamplesPerPixel", Short),
    (0x0116, "RowsPerStrip", Long),
    (0x0117, "StripByteCounts", Long),
    (0x011A, "XResolution", Rational),
    (0x011B, "YResolution", Rational),
    (0x011C, "PlanarConfiguration", Short),
    (0x0128, "ResolutionUnit", Short),
    (0x012D, "TransferFunction", Short),
    (0x0131, "Software", Ascii),
    (0x0132, "DateTime", Ascii),
    (0x013B, "Artist", Ascii),
    (0x013C, "HostComputer", Ascii),
    (0x013D, "Predictor", Short),
    (0x013E, "WhitePoint", Rational),
    (0x013F, "PrimaryChromaticities", Rational),
    (0x0140, "ColorMap", Short),
    (0x0141, "HalftoneHints", Short),
    (0x0142, "TileWidth", Short),
    (0x0143, "TileLength", Short),
    (0x0144, "TileOffsets", Short),
    (0x0145, "TileByteCounts", Short),
    (0x014A, "SubIFDs", Long),
    (0x014C, "InkSet", Short),
    (0x014D, "InkNames", Ascii),
    (0x014E, "NumberOfInks", Short),
    (0x0150, "DotRange", Byte),
    (0x0151, "TargetPrinter", Ascii),
    (0x0152, "ExtraSamples", Short),
    (0x0153, "SampleFormat", Short),
    (0x0154, "SMinSampleValue", Short),
    (0x0155, "SMaxSampleValue", Short),
    (0x0156, "TransferRange", Short),
    (0x0157, "ClipPath", Byte),
    (0x015A, "Indexed", Short),
    (0x015B, "JPEGTables", Undefined),
    (0x015F, "OPIProxy", Short),
    (0x0200, "JPEGProc", Long),
    (0x0203, "JPEGRestartInterval", Short),
    (0x0205, "JPEGLosslessPredictors", Short),
    (0x0206, "JPEGPointTransforms", Short),
    (0x0207, "JPEGQTables", Long),
    (0x0208, "JPEGDCTables", Long),
    (0x0209, "JPEGACTables", Long),
    (0x0211, "YCbCrCoefficients", Rational),
    (0x0212, "YCbCrSubSampling", Short),
    (0x0213, "YCbCrPositioning", Short),
    (0x0214, "ReferenceBlackWhite", Rational),
    (0x02BC, "XMLPacket", Byte),
    (0x4746, "Rating", Short),
    (0x4749, "RatingPercent", Short),
    (0x800D, "ImageID", Ascii),
    (0x828D, "CFARepeatPatternDim", Short),
    (0x828E, "CFAPattern", Byte),
    (0x828F, "BatteryLevel", Rational),
    (0x8298, "Copyright", Ascii),
    (0x829A, "ExposureTime", Rational),
    (0x829D, "FNumber", Rational),
    (0x83BB, "IPTCNAA", Long),
    (0x8649, "ImageResources", Byte),
    (0x8773, "InterColorProfile", Undefined),
    (0x8822, "ExposureProgram", Short),
    (0x8824, "SpectralSensitivity", Ascii),
    (0x8827, "ISOSpeedRatings", Short),
    (0x8828, "OECF", Undefined),
    (0x8829, "Interlace", Short),
    (0x882A, "TimeZoneOffset", SShort),
    (0x882B, "SelfTimerMode", Short),
    (0x9003, "DateTimeOriginal", Ascii),
    (0x9102, "CompressedBitsPerPixel", Rational),
    (0x9201, "ShutterSpeedValue", SRational),
    (0x9202, "ApertureValue", Rational),
    (0x9203, "BrightnessValue", SRational),
    (0x9204, "ExposureBiasValue", SRational),
    (0x9205, "MaxApertureValue", Rational),
    (0x9206, "SubjectDistance", SRational),
    (0x9207, "MeteringMode", Short),
    (0x9208, "LightSource", Short),
    (0x9209, "Flash", Short),
    (0x920A, "FocalLength", Rational),
    (0x920B, "FlashEnergy", Rational),
    (0x920C, "SpatialFrequencyResponse", Undefined),
    (0x920D, "Noise", Undefined),
    (0x920E, "FocalPlaneXResolution", Rational),
    (0x920F, "FocalPlaneYResolution", Rational),
    (0x9210, "FocalPlaneResolutionUnit", Short),
    (0x9211, "ImageNumber", Long),
    (0x9212, "SecurityClassification", Ascii),
    (0x9213, "ImageHistory", Ascii),
    (0x9214, "SubjectLocation", Short),
    (0x9215, "ExposureIndex", Rational),
    (0x9216, "TIFFEPStandardID", Byte),
    (0x9217, "SensingMethod", Short),
    (0x9C9B, "XPTitle", Byte),
    (0x9C9C, "XPComment", Byte),
    (0x9C9D, "XPAuthor", Byte),
    (0x9C9E, "XPKeywords", Byte),
    (0x9C9F, "XPSubject", Byte),
    (0xC4A5, "PrintImageMatching", Undefined),
    (0xC612, "DNGVersion", Byte),
    (0xC613, "DNGBackwardVersion", Byte),
    (0xC614, "UniqueCameraModel", Ascii),
    (0xC615, "LocalizedCameraModel", Byte),
    (0xC62F, "CameraSerialNumber", Ascii),
    (0xC630, "LensInfo", Rational),
];

const EXIF_TAGS: &[(u16, &str, TagType)] = &[
    (0x829A, "ExposureTime", Rational),
    (0x829D, "FNumber", Rational),
    (0x8822, "ExposureProgram", Short),
    (0x8824, "SpectralSensitivity", Ascii),
    (0x8827, "ISOSpeedRatings", Short),
    (0x8828, "OECF", Undefined),
    (0x8830, "SensitivityType", Short),
    (0x8831, "StandardOutputSensitivity", Long),
    (0x8832, "RecommendedExposureIndex", Long),
    (0x8833, "ISOSpeed", Long),
    (0x8834, "ISOSpeedLatitudeyyy", Long),
    (0x8835, "ISOSpeedLatitudezzz", Long),
    (0x9000, "ExifVersion", Undefined),
    (0x9003, "DateTimeOriginal", Ascii),
    (0x9004, "DateTimeDigitized", Ascii),
    (0x9010, "OffsetTime", Ascii),
    (0x9011, "OffsetTimeOriginal", Ascii),
    (0x9012, "OffsetTimeDigitized", Ascii),
    (0x9101, "ComponentsConfiguration", Undefined),
    (0x9102, "CompressedBitsPerPixel", Rational),
    (0x9201, "ShutterSpeedValue", SRational),
    (0x9202, "ApertureValue", Rational),
    (0x9203, "BrightnessValue", SRational),
    (0x9204, "ExposureBiasValue", SRational),
    (0x9205, "MaxApertureValue", Rational),
    (0x9206, "SubjectDistance", Rational),
    (0x9207, "MeteringMode", Short),
    (0x9208, "LightSource", Short),
    (0x9209, "Flash", Short),
    (0x920A, "FocalLength", Rational),
    (0x9214, "SubjectArea", Short),
    (0x927C, "MakerNote", Undefined),
    (TAG_USER_COMMENT, "UserComment", Undefined),
    (0x9290, "SubSecTime", Ascii),
    (0x9291, "SubSecTimeOriginal", Ascii),
    (0x9292, "SubSecTimeDigitized", Ascii),
    (0x9400, "Temperature", SRational),
    (0x9401, "Humidity", Rational),
    (0x9402, "Pressure", Rational),
    (0x9403, "WaterDepth", SRational),
    (0x9404, "Acceleration", Rational),
    (0x9405, "CameraElevationAngle", SRational),
    (0xA000, "FlashpixVersion", Undefined),
    (0xA001, "ColorSpace", Short),
    (0xA002, "PixelXDimension", Long),
    (0xA003, "PixelYDimension", Long),
    (0xA004, "RelatedSoundFile", Ascii),
    (0xA20B, "FlashEnergy", Rational),
    (0xA20C, "SpatialFrequencyResponse", Undefined),
    (0xA20E, "FocalPlaneXResolution", Rational),
    (0xA20F, "FocalPlaneYResolution", Rational),
    (0xA210, "FocalPlaneResolutionUnit", Short),
    (0xA214, "SubjectLocation", Short),
    (0xA215, "ExposureIndex", Rational),
    (0xA217, "SensingMethod", Short),
    (0xA300, "FileSource", Undefined),
    (0xA301, "SceneType", Undefined),
    (0xA302, "CFAPattern", Undefined),
    (0xA401, "CustomRendered", Short),
    (0xA402, "ExposureMode", Short),
    (0xA403, "WhiteBalance", Short),
    (0xA404, "DigitalZoomRatio", Rational),
    (0xA405, "FocalLengthIn35mmFilm", Short),
    (0xA406, "SceneCaptureType", Short),
    (0xA407, "GainControl", Short),
    (0xA408, "Contrast", Short),
    (0xA409, "Saturation", Short),
    (0xA40A, "Sharpness", Short),
    (0xA40B, "DeviceSettingDescription", Undefined),
    (0xA40C, "SubjectDistanceRange", Short),
    (0xA420, "ImageUniqueID", Ascii),
    (0xA430, "CameraOwnerName", Ascii),
    (0xA431, "BodySerialNumber", Ascii),
    (0xA432, "LensSpecification", Rational),
    (0xA433, "LensMake", Ascii),
    (0xA434, "LensModel", Ascii),
    (0xA435, "LensSerialNumber", Ascii),
    (0xA500, "Gamma", Rational),
];

const GPS_TAGS: &[(u16, &str, TagType)] = &[
    (0x0000, "GPSVersionID", Byte),
    (0x0001, "GPSLatitudeRef", Ascii),
    (0x0002, "GPSLatitude", Rational),
    (0x0003, "GPSLongitudeRef", Ascii),
    (0x0004, "GPSLongitude", Rational),
    (0x0005, "GPSAltitudeRef", Byte),
    (0x0006, "GPSAltitude", Rational),
    (0x0007, "GPSTimeStamp", Rational),
    (0x0008, "GPSSatellites", Ascii),
    (0x0009, "GPSStatus", Ascii),
    (0x000A, "GPSMeasureMode", Ascii),
    (0x000B, "GPSDOP", Rational),
    (0x000C, "GPSSpeedRef", Ascii),
    (0x000D, "GPSSpeed", Rational),
    (0x000E, "GPSTrackRef", Ascii),
    (0x000F, "GPSTrack", Rational),
    (0x0010, "GPSImgDirectionRef", Ascii),
    (0x0011, "GPSImgDirection", Rational),
    (0x0012, "GPSMapDatum", Ascii),
    (0x0013, "GPSDestLatitudeRef", Ascii),
    (0x0014, "GPSDestLatitude", Rational),
    (0x0015, "GPSDestLongitudeRef", Ascii),
    (0x0016, "GPSDestLongitude", Rational),
    (0x0017, "GPSDestBearingRef", Ascii),
    (0x0018, "GPSDestBearing", Rational),
    (0x0019, "GPSDestDistanceRef", Ascii),
    (0x001A, "GPSDestDistance", Rational),
    (0x001B, "GPSProcessingMethod", Undefined),
    (0x001C, "GPSAreaInformation", Undefined),
    (0x001D, "GPSDateStamp", Ascii),
    (0x001E, "GPSDifferential", Short),
    (0x001F, "GPSHPositioningError", Rational),
];

const INTEROP_TAGS: &[(u16, &str, TagType)] = &[
    (0x0001, "InteroperabilityIndex", Ascii),
    (0x0002, "InteroperabilityVersion", Undefined),
    (0x1000, "RelatedImageFileFormat", Ascii),
    (0x1001, "RelatedImageWidth", Long),
    (0x1002, "RelatedImageLength", Long),
];

/// One dictionary entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagInfo {
    pub name: &'static str,
    pub group: IfdKind,
    pub id: u16,
    pub tag_type: TagType,
}

/// Immutable name/id lookup tables, built once at startup and shared
/// read-only by the mutator and the printer.
#[derive(Debug, Clone)]
pub struct TagDictionary {
    by_name: HashMap<(IfdKind, &'static str), TagInfo>,
    by_id: HashMap<(IfdKind, u16), TagInfo>,
}

impl TagDictionary {
    /// The built-in table covering the primary, Exif, GPS, and Interop IFDs.
    pub fn standard() -> Self {
        let groups = [
            (IfdKind::Primary, IMAGE_TAGS),
            (IfdKind::Exif, EXIF_TAGS),
            (IfdKind::Gps, GPS_TAGS),
            (IfdKind::Interop, INTEROP_TAGS),
        ];

        let mut by_name = HashMap::new();
        let mut by_id = HashMap::new();
        for (group, table) in groups {
            for &(id, name, tag_type) in table {
                let info = TagInfo {
                    name,
                    group,
                    id,
                    tag_type,
                };
                by_name.insert((group, name), info);
                by_id.insert((group, id), info);
            }
        }

        Self { by_name, by_id }
    }

    /// Look up a field name within one directory group. Exact, case-sensitive.
    pub fn resolve(&self, group: IfdKind, name: &str) -> Result<TagInfo> {
        self.by_name
            .get(&(table_for(group), name))
            .copied()
            .ok_or_else(|| ExifError::UnknownTag(name.to_string()))
    }

    /// Look up a tag id within one directory group.
    pub fn info(&self, group: IfdKind, id: u16) -> Option<TagInfo> {
        self.by_id.get(&(table_for(group), id)).copied()
    }

    /// Display name for a tag; unknown ids render as `0x%04x`.
    pub fn name_for(&self, group: IfdKind, id: u16) -> Cow<'static, str> {
        match self.info(group, id) {
            Some(info) => Cow::Borrowed(info.name),
            None => Cow::Owned(format!("0x{id:04x}")),
        }
    }
}

impl Default for TagDictionary {
    fn default() -> Self {
        Self::standard()
    }
}

/// The thumbnail IFD shares the primary image's tag table.
fn table_for(group: IfdKind) -> IfdKind {
    match group {
        IfdKind::Thumbnail => IfdKind::Primary,
        other => other,
    }
}
