use base64::{engine::general_purpose::STANDARD, Engine};
use identicon_png::{
    decode, identicon, ColorSlot, EncodeError, Pixel, PngEncoder, SaturationPolicy,
};

fn init_logger() {
    let _ = pretty_env_logger::try_init();
}

#[test]
fn smallest_blank_image() {
    init_logger();
    let mut png = PngEncoder::new(1, 1, 1).unwrap();
    insta::assert_snapshot!(
        png.to_base64(),
        @"iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAMAAAAoyzS7AAAAA1BMVEUAAACnej3aAAAAAXRSTlMAQObYZgAAAA1JREFUeNoBAgD9/wAAAAIAAVMrnDAAAAAASUVORK5CYII="
    );

    let image = decode(&png.to_bytes()).unwrap();
    assert_eq!((image.width, image.height), (1, 1));
    assert_eq!(image.palette, [Pixel::new(0, 0, 0, 0)]);
    assert_eq!(image.indices, [0]);
}

#[test]
fn second_color_on_one_pixel() {
    init_logger();
    let mut png = PngEncoder::new(2, 2, 2).unwrap();
    assert_eq!(png.color(0, 0, 0).unwrap(), ColorSlot::Assigned(0));
    let red = png.register_color(255, 0, 0, 255).unwrap();
    assert_eq!(red, ColorSlot::Assigned(1));
    png.write_pixel(0, 0, red.index()).unwrap();
    insta::assert_snapshot!(
        png.to_base64(),
        @"iVBORw0KGgoAAAANSUhEUgAAAAIAAAACCAMAAABFaP0WAAAABlBMVEUAAAD/AAAb/40iAAAAAnRSTlP//8i138cAAAARSURBVHjaAQYA+f8AAQAAAAAACwAC5AGNfQAAAABJRU5ErkJggg=="
    );

    let image = decode(&png.to_bytes()).unwrap();
    assert_eq!(image.pixel(0, 0), Some(Pixel::opaque(255, 0, 0)));
    for (x, y) in [(1, 0), (0, 1), (1, 1)] {
        assert_eq!(image.pixel(x, y), Some(Pixel::opaque(0, 0, 0)));
    }
}

#[test]
fn first_registered_color_is_index_zero() {
    let mut png = PngEncoder::new(2, 2, 2).unwrap();
    let red = png.register_color(255, 0, 0, 255).unwrap();
    assert_eq!(red, ColorSlot::Assigned(0));
    png.write_pixel(0, 0, red.index()).unwrap();

    let image = decode(&png.to_bytes()).unwrap();
    assert!(image
        .indices
        .iter()
        .all(|&i| image.palette[i as usize] == Pixel::opaque(255, 0, 0)));
}

#[test]
fn palette_saturates_silently() {
    init_logger();
    let mut png = PngEncoder::new(10, 10, 256).unwrap();
    let colors: Vec<_> = (0..300u32)
        .map(|i| Pixel::opaque(i as u8, (i >> 8) as u8, 0x80))
        .collect();
    for (i, &color) in colors.iter().enumerate() {
        let slot = png.register_pixel(color).unwrap();
        if i < 256 {
            assert_eq!(slot, ColorSlot::Assigned(i as u8));
        } else {
            assert_eq!(slot, ColorSlot::Saturated);
            assert_eq!(slot.index(), 0);
        }
    }
    assert_eq!(png.palette_len(), 256);
    // Known colors still resolve once the palette is full.
    assert_eq!(
        png.register_pixel(colors[42]).unwrap(),
        ColorSlot::Assigned(42)
    );

    let image = decode(&png.to_bytes()).unwrap();
    assert_eq!(image.palette, colors[..256]);
}

#[test]
fn rejecting_policy_reports_exhaustion() {
    let mut png = PngEncoder::new(4, 4, 2)
        .unwrap()
        .with_saturation(SaturationPolicy::Reject);
    png.color(1, 1, 1).unwrap();
    png.color(2, 2, 2).unwrap();
    assert_eq!(
        png.color(3, 3, 3),
        Err(EncodeError::PaletteExhausted { depth: 2 })
    );
    assert_eq!(png.color(2, 2, 2), Ok(ColorSlot::Assigned(1)));

    let image = decode(&png.to_bytes()).unwrap();
    assert_eq!(
        image.palette,
        [Pixel::opaque(1, 1, 1), Pixel::opaque(2, 2, 2)]
    );
}

#[test]
fn invalid_dimensions() {
    assert!(matches!(
        PngEncoder::new(0, 10, 4),
        Err(EncodeError::InvalidDimensions { .. })
    ));
    assert!(matches!(
        PngEncoder::new(10, 10, 300),
        Err(EncodeError::InvalidDimensions { .. })
    ));
}

#[test]
fn base64_decodes_to_file_bytes() {
    let mut png = PngEncoder::new(7, 5, 3).unwrap();
    let bytes = png.to_bytes();
    let decoded = STANDARD.decode(png.to_base64()).unwrap();
    assert_eq!(decoded, bytes);
    assert_eq!(&decoded[..8], b"\x89PNG\r\n\x1a\n");
}

#[test]
fn blank_images_of_many_sizes() {
    for (width, height, depth) in [(1, 1, 256), (3, 17, 1), (64, 64, 8), (255, 1, 2)] {
        let mut png = PngEncoder::new(width, height, depth).unwrap();
        let image = decode(&png.to_bytes()).unwrap();
        assert_eq!((image.width, image.height), (width, height));
        assert_eq!(image.palette.len(), depth as usize);
        assert!(image.indices.iter().all(|&i| i == 0));
    }
}

/// 300x300 needs two stored blocks; rows cross the boundary.
#[test]
fn round_trip_across_stored_blocks() {
    init_logger();
    let (width, height) = (300, 300);
    let mut png = PngEncoder::new(width, height, 16).unwrap();
    let palette: Vec<_> = (0..16u8)
        .map(|i| Pixel::new(i * 16, 255 - i * 16, i, 255 - i))
        .collect();
    for &color in &palette {
        png.register_pixel(color).unwrap();
    }
    let expected: Vec<u8> = (0..height)
        .flat_map(|y| (0..width).map(move |x| ((x * 7 + y * 3) % 16) as u8))
        .collect();
    for y in 0..height {
        for x in 0..width {
            png.write_pixel(x, y, expected[(y * width + x) as usize]).unwrap();
        }
    }

    let image = decode(&png.to_bytes()).unwrap();
    assert_eq!(image.palette, palette);
    assert_eq!(image.indices, expected);
}

#[test]
fn exact_block_boundary() {
    // 65534 pixels plus the filter byte fill one stored block per row.
    let mut png = PngEncoder::new(65_534, 2, 2).unwrap();
    png.color(0, 0, 0).unwrap();
    png.color(255, 255, 255).unwrap();
    png.write_pixel(65_533, 0, 1).unwrap();
    png.write_pixel(0, 1, 1).unwrap();

    let image = decode(&png.to_bytes()).unwrap();
    assert_eq!(image.index(65_533, 0), Some(1));
    assert_eq!(image.index(0, 1), Some(1));
    assert_eq!(image.index(1, 1), Some(0));
    assert_eq!(image.indices.iter().filter(|&&i| i == 1).count(), 2);
}

#[test]
fn identicon_is_a_blank_100px_image() {
    let encoded = identicon::generate("seed").unwrap();
    let image = decode(&STANDARD.decode(encoded).unwrap()).unwrap();
    assert_eq!((image.width, image.height), (100, 100));
    assert_eq!(image.palette.len(), 16);
    assert!(image.indices.iter().all(|&i| i == 0));
}
