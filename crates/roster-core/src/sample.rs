use crate::record::{Record, SequenceNumber};

/// Built-in roster shown in demo mode and whenever the shared snapshot cannot be loaded.
#[must_use]
pub fn sample_records() -> Vec<Record> {
    [
        (
            1,
            "Nguyễn Văn A (Dữ liệu mẫu)",
            "Phòng Kỹ thuật",
            "Khối Sản xuất",
            "15/05/1990",
            "0901234567",
            "Đã đăng nhập",
        ),
        (
            2,
            "Trần Thị B (Dữ liệu mẫu)",
            "Phòng Nhân sự",
            "Khối Hành chính",
            "22/08/1992",
            "0912345678",
            "Đã đăng nhập",
        ),
        (
            3,
            "Lê Văn C (Dữ liệu mẫu)",
            "Phòng Kinh doanh",
            "Khối Thương mại",
            "10/12/1988",
            "0987654321",
            "Chưa đăng nhập",
        ),
    ]
    .into_iter()
    .map(|(stt, full_name, unit, parent_unit, date_of_birth, phone, status)| Record {
        sequence_number: SequenceNumber::Number(stt),
        full_name: full_name.to_string(),
        unit: unit.to_string(),
        parent_unit: parent_unit.to_string(),
        date_of_birth: date_of_birth.to_string(),
        phone: phone.to_string(),
        status: status.to_string(),
    })
    .collect()
}
