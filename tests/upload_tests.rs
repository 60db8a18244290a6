use image::{Rgba, RgbaImage};
use kodasnap::capture::{accept_uploads, capture_from_live_frame, CaptureSettings, UploadedFile};
use kodasnap::error::ErrorKind;
use kodasnap::photo::encode_png;
use kodasnap::session::{BoothSession, Screen};

fn png_file(name: &str, width: u32, height: u32) -> UploadedFile {
    let pixels = RgbaImage::from_pixel(width, height, Rgba([120, 80, 200, 255]));
    UploadedFile::new(name, encode_png(&pixels).unwrap())
}

#[test]
fn test_mixed_upload_keeps_images_and_rejects_text() {
    // GIVEN: Two images and a text file
    let files = vec![
        png_file("beach.png", 800, 600),
        UploadedFile::new("notes.txt", b"remember the sunscreen".to_vec()),
        png_file("sunset.png", 640, 480),
    ];

    // WHEN: Uploading with room for three photos
    let outcome = accept_uploads(&files, 3, &CaptureSettings::default());

    // THEN: Two photos, one rejection, both photos cropped to 2.5:1
    assert_eq!(outcome.accepted.len(), 2);
    assert_eq!(outcome.rejected.len(), 1);
    assert_eq!(outcome.rejected[0].name, "notes.txt");
    assert_eq!(outcome.rejected[0].error.kind(), ErrorKind::UnsupportedMediaType);
    assert_eq!(
        (outcome.accepted[0].width(), outcome.accepted[0].height()),
        (800, 320)
    );
    assert_eq!(
        (outcome.accepted[1].width(), outcome.accepted[1].height()),
        (640, 256)
    );
}

#[test]
fn test_session_reports_one_notice_per_rejected_file() {
    let mut session = BoothSession::default();
    session.start().unwrap();
    session.confirm_payment().unwrap();
    session.choose_photo_count(3).unwrap();

    session
        .upload(&[
            png_file("a.png", 500, 200),
            UploadedFile::new("notes.txt", b"hello".to_vec()),
            png_file("b.png", 500, 200),
        ])
        .unwrap();

    assert_eq!(session.photos().len(), 2);
    assert_eq!(session.screen(), Screen::Capture);
    assert_eq!(session.notices().len(), 1);
}

#[test]
fn test_mirrored_capture_moves_left_marker_right() {
    // GIVEN: A 1280x512 frame with a red stripe along the left edge
    let mut frame = RgbaImage::from_pixel(1280, 512, Rgba([0, 0, 0, 255]));
    for y in 0..512 {
        for x in 0..4 {
            frame.put_pixel(x, y, Rgba([255, 0, 0, 255]));
        }
    }
    let settings = CaptureSettings {
        mirror: true,
        ..CaptureSettings::default()
    };

    // WHEN: Capturing with mirroring on
    let photo = capture_from_live_frame(&frame, &settings).unwrap();

    // THEN: The stripe lands on the right edge
    let pixels = photo.pixels();
    assert_eq!(pixels.get_pixel(1279, 256).0, [255, 0, 0, 255]);
    assert_eq!(pixels.get_pixel(1276, 256).0, [255, 0, 0, 255]);
    assert_eq!(pixels.get_pixel(0, 256).0, [0, 0, 0, 255]);
}
