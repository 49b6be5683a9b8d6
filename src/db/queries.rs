use chrono::{NaiveDate, NaiveDateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::models::{
    Booking, BookingStatus, Car, PaymentStatus, Review, Service, Shop, User, UserType,
};

const DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";

fn now_string() -> String {
    Utc::now().naive_utc().format(DATETIME_FMT).to_string()
}

fn parse_datetime(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, DATETIME_FMT).unwrap_or_else(|_| Utc::now().naive_utc())
}

fn parse_string_list(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}

// ── Shops ──

const SHOP_COLUMNS: &str = "id, name, description, address, city, state, zip, phone, email, \
     specialties, certifications, rating_average, review_count";

fn parse_shop_row(row: &rusqlite::Row) -> rusqlite::Result<Shop> {
    let specialties: String = row.get(9)?;
    let certifications: String = row.get(10)?;
    Ok(Shop {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        address: row.get(3)?,
        city: row.get(4)?,
        state: row.get(5)?,
        zip: row.get(6)?,
        phone: row.get(7)?,
        email: row.get(8)?,
        specialties: parse_string_list(&specialties),
        certifications: parse_string_list(&certifications),
        rating_average: row.get(11)?,
        review_count: row.get(12)?,
    })
}

/// All shops in insertion order; filtering happens in the search engine.
pub fn list_shops(conn: &Connection) -> anyhow::Result<Vec<Shop>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHOP_COLUMNS} FROM shops ORDER BY rowid ASC"
    ))?;
    let rows = stmt.query_map([], parse_shop_row)?;

    let mut shops = vec![];
    for row in rows {
        shops.push(row?);
    }
    Ok(shops)
}

pub fn get_shop(conn: &Connection, id: &str) -> anyhow::Result<Option<Shop>> {
    let shop = conn
        .query_row(
            &format!("SELECT {SHOP_COLUMNS} FROM shops WHERE id = ?1"),
            params![id],
            parse_shop_row,
        )
        .optional()?;
    Ok(shop)
}

// ── Services ──

fn parse_service_row(row: &rusqlite::Row) -> rusqlite::Result<Service> {
    Ok(Service {
        id: row.get(0)?,
        shop_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        price_range: row.get(4)?,
        duration: row.get(5)?,
        category: row.get(6)?,
    })
}

pub fn get_services_for_shop(conn: &Connection, shop_id: &str) -> anyhow::Result<Vec<Service>> {
    let mut stmt = conn.prepare(
        "SELECT id, shop_id, name, description, price_range, duration, category
         FROM services WHERE shop_id = ?1 ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map(params![shop_id], parse_service_row)?;

    let mut services = vec![];
    for row in rows {
        services.push(row?);
    }
    Ok(services)
}

// ── Bookings ──

const BOOKING_COLUMNS: &str = "id, customer_id, shop_id, service_id, appointment_date, appointment_time, \
     status, payment_status, vehicle_make, vehicle_model, vehicle_year, problem_description, \
     special_instructions, estimated_cost, final_cost, created_at, updated_at";

pub fn create_booking(conn: &Connection, booking: &Booking) -> anyhow::Result<()> {
    conn.execute(
        &format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)"
        ),
        params![
            booking.id,
            booking.customer_id,
            booking.shop_id,
            booking.service_id,
            booking.appointment_date.format(DATE_FMT).to_string(),
            booking.appointment_time,
            booking.status.as_str(),
            booking.payment_status.as_str(),
            booking.vehicle_make,
            booking.vehicle_model,
            booking.vehicle_year,
            booking.problem_description,
            booking.special_instructions,
            booking.estimated_cost,
            booking.final_cost,
            booking.created_at.format(DATETIME_FMT).to_string(),
            booking.updated_at.format(DATETIME_FMT).to_string(),
        ],
    )?;
    Ok(())
}

pub fn get_booking_by_id(conn: &Connection, id: &str) -> anyhow::Result<Option<Booking>> {
    let result = conn.query_row(
        &format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = ?1"),
        params![id],
        |row| Ok(parse_booking_row(row)),
    );

    match result {
        Ok(booking) => Ok(Some(booking?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn get_bookings_for_customer(
    conn: &Connection,
    customer_id: &str,
) -> anyhow::Result<Vec<Booking>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE customer_id = ?1
         ORDER BY appointment_date DESC, appointment_time DESC"
    ))?;

    let rows = stmt.query_map(params![customer_id], |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

pub fn get_bookings_for_shop(
    conn: &Connection,
    shop_id: &str,
    status_filter: Option<BookingStatus>,
) -> anyhow::Result<Vec<Booking>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE shop_id = ?1 AND status = ?2 \
                 ORDER BY appointment_date ASC, appointment_time ASC"
            ),
            vec![
                Box::new(shop_id.to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(status.as_str()),
            ],
        ),
        None => (
            format!(
                "SELECT {BOOKING_COLUMNS} FROM bookings WHERE shop_id = ?1 \
                 ORDER BY appointment_date ASC, appointment_time ASC"
            ),
            vec![Box::new(shop_id.to_string()) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_booking_row(row)))?;

    let mut bookings = vec![];
    for row in rows {
        bookings.push(row??);
    }
    Ok(bookings)
}

/// Moves a booking from `from` to `to`. Returns false when the booking is
/// missing or no longer in `from`.
pub fn update_booking_status(
    conn: &Connection,
    id: &str,
    from: BookingStatus,
    to: BookingStatus,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET status = ?1, updated_at = ?2 WHERE id = ?3 AND status = ?4",
        params![to.as_str(), now_string(), id, from.as_str()],
    )?;
    Ok(count > 0)
}

/// Returns false when the booking is missing or has left `expected` status.
pub fn reschedule_booking(
    conn: &Connection,
    id: &str,
    expected: BookingStatus,
    date: NaiveDate,
    time: &str,
) -> anyhow::Result<bool> {
    let count = conn.execute(
        "UPDATE bookings SET appointment_date = ?1, appointment_time = ?2, updated_at = ?3
         WHERE id = ?4 AND status = ?5",
        params![
            date.format(DATE_FMT).to_string(),
            time,
            now_string(),
            id,
            expected.as_str()
        ],
    )?;
    Ok(count > 0)
}

fn parse_booking_row(row: &rusqlite::Row) -> anyhow::Result<Booking> {
    let appointment_date_str: String = row.get(4)?;
    let status_str: String = row.get(6)?;
    let payment_status_str: String = row.get(7)?;
    let created_at_str: String = row.get(15)?;
    let updated_at_str: String = row.get(16)?;

    let appointment_date = NaiveDate::parse_from_str(&appointment_date_str, DATE_FMT)?;
    let status = BookingStatus::parse(&status_str)
        .ok_or_else(|| anyhow::anyhow!("unknown booking status: {status_str}"))?;

    Ok(Booking {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        shop_id: row.get(2)?,
        service_id: row.get(3)?,
        appointment_date,
        appointment_time: row.get(5)?,
        status,
        payment_status: PaymentStatus::parse(&payment_status_str),
        vehicle_make: row.get(8)?,
        vehicle_model: row.get(9)?,
        vehicle_year: row.get(10)?,
        problem_description: row.get(11)?,
        special_instructions: row.get(12)?,
        estimated_cost: row.get(13)?,
        final_cost: row.get(14)?,
        created_at: parse_datetime(&created_at_str),
        updated_at: parse_datetime(&updated_at_str),
    })
}

// ── Cars ──

fn parse_car_row(row: &rusqlite::Row) -> rusqlite::Result<Car> {
    Ok(Car {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        car_make: row.get(2)?,
        car_model: row.get(3)?,
        car_trim: row.get(4)?,
        car_year: row.get(5)?,
        car_license_plate: row.get(6)?,
    })
}

pub fn get_cars_for_customer(conn: &Connection, customer_id: &str) -> anyhow::Result<Vec<Car>> {
    let mut stmt = conn.prepare(
        "SELECT id, customer_id, car_make, car_model, car_trim, car_year, car_license_plate
         FROM cars WHERE customer_id = ?1 ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt.query_map(params![customer_id], parse_car_row)?;

    let mut cars = vec![];
    for row in rows {
        cars.push(row?);
    }
    Ok(cars)
}

pub fn create_car(conn: &Connection, car: &Car) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO cars (id, customer_id, car_make, car_model, car_trim, car_year, car_license_plate)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            car.id,
            car.customer_id,
            car.car_make,
            car.car_model,
            car.car_trim,
            car.car_year,
            car.car_license_plate,
        ],
    )?;
    Ok(())
}

pub fn delete_car(conn: &Connection, id: &str) -> anyhow::Result<bool> {
    let count = conn.execute("DELETE FROM cars WHERE id = ?1", params![id])?;
    Ok(count > 0)
}

// ── Users ──

pub fn get_user(conn: &Connection, id: &str) -> anyhow::Result<Option<User>> {
    let user = conn
        .query_row(
            "SELECT id, email, first_name, last_name, user_type, phone FROM users WHERE id = ?1",
            params![id],
            |row| {
                let user_type: String = row.get(4)?;
                Ok(User {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    first_name: row.get(2)?,
                    last_name: row.get(3)?,
                    user_type: UserType::parse(&user_type),
                    phone: row.get(5)?,
                })
            },
        )
        .optional()?;
    Ok(user)
}

pub fn save_user(conn: &Connection, user: &User) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, first_name, last_name, user_type, phone)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(id) DO UPDATE SET
           email = excluded.email,
           first_name = excluded.first_name,
           last_name = excluded.last_name,
           user_type = excluded.user_type,
           phone = excluded.phone,
           updated_at = datetime('now')",
        params![
            user.id,
            user.email,
            user.first_name,
            user.last_name,
            user.user_type.as_str(),
            user.phone,
        ],
    )?;
    Ok(())
}

// ── Reviews ──

pub fn review_exists_for_booking(conn: &Connection, booking_id: &str) -> anyhow::Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM reviews WHERE booking_id = ?1",
        params![booking_id],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

/// Inserts the review and folds its rating into the shop's rating total.
pub fn create_review(conn: &Connection, review: &Review) -> anyhow::Result<()> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO reviews (id, booking_id, shop_id, customer_id, rating, comment, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            review.id,
            review.booking_id,
            review.shop_id,
            review.customer_id,
            review.rating,
            review.comment,
            review.created_at.format(DATETIME_FMT).to_string(),
        ],
    )?;

    tx.execute(
        "UPDATE shops SET
           rating_total = rating_total + ?1,
           review_count = review_count + 1,
           rating_average = ROUND((rating_total + ?1) / (review_count + 1), 2)
         WHERE id = ?2",
        params![review.rating as f64, review.shop_id],
    )?;

    tx.commit()?;
    Ok(())
}

pub fn get_reviews_for_shop(conn: &Connection, shop_id: &str) -> anyhow::Result<Vec<Review>> {
    let mut stmt = conn.prepare(
        "SELECT id, booking_id, shop_id, customer_id, rating, comment, created_at
         FROM reviews WHERE shop_id = ?1 ORDER BY created_at DESC",
    )?;

    let rows = stmt.query_map(params![shop_id], |row| {
        let created_at: String = row.get(6)?;
        Ok(Review {
            id: row.get(0)?,
            booking_id: row.get(1)?,
            shop_id: row.get(2)?,
            customer_id: row.get(3)?,
            rating: row.get(4)?,
            comment: row.get(5)?,
            created_at: parse_datetime(&created_at),
        })
    })?;

    let mut reviews = vec![];
    for row in rows {
        reviews.push(row?);
    }
    Ok(reviews)
}
